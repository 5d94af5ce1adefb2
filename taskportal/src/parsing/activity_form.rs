use std::sync::LazyLock;

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

use crate::{
    domain::{ActivityId, OptionRecord, TaskRecord},
    MalformedMarkupError,
};

use super::inner_text;

static CLIENT_OPTIONS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#client option").unwrap());
static SELECTED_CLIENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#client option[selected]").unwrap());
static SELECTED_PROJECT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#project option[selected]").unwrap());
static SELECTED_TASK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#task option[selected]").unwrap());
static DATE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#date").unwrap());
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#activityDescription").unwrap());
static HOURS: LazyLock<Selector> = LazyLock::new(|| Selector::parse(r#"[name="hrs"]"#).unwrap());
static MINUTES: LazyLock<Selector> = LazyLock::new(|| Selector::parse(r#"[name="min"]"#).unwrap());
static BILLABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[name="billable"]"#).unwrap());
static SELECTED_OPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("option[selected]").unwrap());

const DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];

/// Reads one activity from its edit form.
///
/// Missing selections, hours or description fall back to the draft defaults.
/// The date has no sensible default and is required.
pub fn parse_activity_details(
    html: &str,
    activity_id: ActivityId,
) -> Result<TaskRecord, MalformedMarkupError> {
    let document = Html::parse_document(html);

    let date = parse_date(&document)?;
    let mut task = TaskRecord::draft(date);
    task.activity_id = Some(activity_id);

    if let Some((id, name)) = selected_option(&document, &SELECTED_CLIENT) {
        task.client_id = id;
        task.client_name = name;
    }
    if let Some((id, name)) = selected_option(&document, &SELECTED_PROJECT) {
        task.project_id = id;
        task.project_name = name;
    }
    if let Some((id, name)) = selected_option(&document, &SELECTED_TASK) {
        task.task_id = id;
        task.task_name = name;
    }

    if let Some(description) = document.select(&DESCRIPTION).next().and_then(|e| inner_text(&e)) {
        task.description = description;
    }
    if let Some(hours) = field_value(&document, &HOURS).and_then(|v| v.parse().ok()) {
        task.hours = hours;
    }
    if let Some(minutes) = field_value(&document, &MINUTES).and_then(|v| v.parse().ok()) {
        task.minutes = minutes;
    }
    if let Some(billable) = document.select(&BILLABLE).next() {
        task.is_billable = is_checked(&billable);
    }

    Ok(task)
}

/// Options of the client picker on the "create activity" form.
///
/// Placeholder options without a numeric value are left out.
pub fn parse_client_options(html: &str) -> Vec<OptionRecord> {
    let document = Html::parse_document(html);

    document
        .select(&CLIENT_OPTIONS)
        .filter_map(|option| {
            let value = option.value().attr("value").unwrap_or_default();
            let Ok(id) = value.trim().parse::<u64>() else {
                tracing::debug!("Skipping client option with value {:?}", value);
                return None;
            };

            Some(OptionRecord {
                id,
                name: inner_text(&option).unwrap_or_default(),
                is_default: option.value().attr("selected").is_some(),
            })
        })
        .collect()
}

fn parse_date(document: &Html) -> Result<NaiveDate, MalformedMarkupError> {
    let element = document
        .select(&DATE)
        .next()
        .ok_or(MalformedMarkupError::MissingElement("#date"))?;
    let value = element.value().attr("value").unwrap_or_default().trim();

    // Some pages append a time, e.g. "8/1/2017 12:00:00 AM".
    let day_part = value.split_whitespace().next().unwrap_or_default();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(day_part, format).ok())
        .ok_or_else(|| MalformedMarkupError::UnreadableValue {
            selector: "#date",
            value: value.to_string(),
        })
}

fn selected_option(document: &Html, selector: &Selector) -> Option<(Option<u64>, Option<String>)> {
    let option = document.select(selector).next()?;
    let id = option
        .value()
        .attr("value")
        .and_then(|v| v.trim().parse().ok());
    Some((id, inner_text(&option)))
}

/// Value of an input, or of the selected option when the field is a select.
fn field_value(document: &Html, selector: &Selector) -> Option<String> {
    let field = document.select(selector).next()?;
    let value = if field.value().name() == "select" {
        field
            .select(&SELECTED_OPTION)
            .next()?
            .value()
            .attr("value")?
            .to_string()
    } else {
        field.value().attr("value")?.to_string()
    };
    Some(value.trim().to_string())
}

fn is_checked(field: &ElementRef) -> bool {
    let element = field.value();
    if element.attr("type") == Some("checkbox") {
        return element.attr("checked").is_some();
    }
    matches!(
        element
            .attr("value")
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref(),
        Some("true" | "on" | "1" | "yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIVITY_DETAILS: &str = include_str!("../../fixtures/activity_details.html");
    const CREATE_ACTIVITY: &str = include_str!("../../fixtures/create_activity.html");

    #[test]
    fn reads_full_activity_form() {
        let task = parse_activity_details(ACTIVITY_DETAILS, ActivityId::new(229268)).unwrap();

        assert_eq!(task.activity_id, Some(ActivityId::new(229268)));
        assert_eq!(task.client_id, Some(101));
        assert_eq!(task.client_name.as_deref(), Some("Acme Insurance"));
        assert_eq!(task.project_id, Some(2001));
        assert_eq!(task.project_name.as_deref(), Some("Policy Admin Modernization"));
        assert_eq!(task.task_id, Some(31));
        assert_eq!(task.task_name.as_deref(), Some("Development"));
        assert_eq!(task.date, NaiveDate::from_ymd_opt(2017, 8, 1).unwrap());
        assert_eq!(task.description, "Reviewed claims intake pull requests");
        assert_eq!(task.hours, 2);
        assert_eq!(task.minutes, 30);
        assert!(task.is_billable);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let html = r#"<form><input id="date" value="2017-08-03" /></form>"#;
        let task = parse_activity_details(html, ActivityId::new(7)).unwrap();

        assert_eq!(task.date, NaiveDate::from_ymd_opt(2017, 8, 3).unwrap());
        assert_eq!(task.client_id, None);
        assert_eq!(task.client_name, None);
        assert_eq!(task.hours, 0);
        assert_eq!(task.minutes, 0);
        assert_eq!(task.description, "");
        assert!(task.is_billable);
    }

    #[test]
    fn date_with_time_suffix() {
        let html = r#"<input id="date" value="8/1/2017 12:00:00 AM" />"#;
        let task = parse_activity_details(html, ActivityId::new(7)).unwrap();
        assert_eq!(task.date, NaiveDate::from_ymd_opt(2017, 8, 1).unwrap());
    }

    #[test]
    fn missing_date_is_an_error() {
        let html = r#"<select id="client"><option value="1" selected>Acme</option></select>"#;
        assert_eq!(
            parse_activity_details(html, ActivityId::new(7)),
            Err(MalformedMarkupError::MissingElement("#date"))
        );

        let html = r#"<input id="date" value="someday" />"#;
        assert!(matches!(
            parse_activity_details(html, ActivityId::new(7)),
            Err(MalformedMarkupError::UnreadableValue { .. })
        ));
    }

    #[test]
    fn unchecked_billable_checkbox() {
        let html = r#"<input id="date" value="8/1/2017" />
            <input type="checkbox" name="billable" value="true" />"#;
        let task = parse_activity_details(html, ActivityId::new(7)).unwrap();
        assert!(!task.is_billable);

        let html = r#"<input id="date" value="8/1/2017" />
            <input type="hidden" name="billable" value="False" />"#;
        let task = parse_activity_details(html, ActivityId::new(7)).unwrap();
        assert!(!task.is_billable);
    }

    #[test]
    fn client_options_with_default() {
        let clients = parse_client_options(CREATE_ACTIVITY);

        assert_eq!(
            clients,
            vec![
                OptionRecord::new(101, "Acme Insurance"),
                OptionRecord {
                    id: 102,
                    name: "Globex".to_string(),
                    is_default: true,
                },
                OptionRecord::new(103, "Initech"),
            ]
        );
    }

    #[test]
    fn client_placeholder_options_are_dropped() {
        let html = r#"<select id="client">
            <option value="">-- Select Client --</option>
            <option>None</option>
            <option value="7">Hooli</option>
        </select>"#;

        assert_eq!(parse_client_options(html), vec![OptionRecord::new(7, "Hooli")]);
    }

    #[test]
    fn client_options_empty_for_unrelated_markup() {
        assert!(parse_client_options("<p>Session expired</p>").is_empty());
        assert!(parse_client_options("").is_empty());
    }
}
