use anyhow::{Result, bail};
use chrono::{Datelike, NaiveDate};
use std::fmt;
use tracing::info;

use crate::browser::{Locator, PageDriver, Step};
use crate::dashboard::{Timing, click_step, log_url};

const MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// Portuguese month name for a 1-based month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    MONTHS.get(month.checked_sub(1)? as usize).copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            bail!("date range starts after it ends: {from} > {to}");
        }
        Ok(Self { from, to })
    }
}

/// The period filter of the ranking screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    CurrentMonth,
    CurrentWeek,
    LastMonth,
    Custom(DateRange),
}

impl Period {
    /// `data-value` of the option in the period dropdown.
    pub fn data_value(&self) -> &'static str {
        match self {
            Period::CurrentMonth => "CURRENT_MONTH",
            Period::CurrentWeek => "CURRENT_WEEK",
            Period::LastMonth => "LAST_MONTH",
            Period::Custom(_) => "DATE",
        }
    }

    /// Label of the option as the dashboard shows it.
    pub fn label(&self) -> &'static str {
        match self {
            Period::CurrentMonth => "Mês atual",
            Period::CurrentWeek => "Semana atual",
            Period::LastMonth => "Mês anterior",
            Period::Custom(_) => "Data",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Custom(range) => write!(f, "{} ({} to {})", self.label(), range.from, range.to),
            _ => f.write_str(self.label()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    From,
    To,
}

impl DateField {
    fn input_id(self) -> &'static str {
        match self {
            DateField::From => "From",
            DateField::To => "To",
        }
    }

    fn label(self) -> &'static str {
        match self {
            DateField::From => "De",
            DateField::To => "Até",
        }
    }
}

fn period_toggle() -> Step {
    Step::clickable(
        "period selector",
        vec![
            Locator::css("div[id='bc_select_field -toggle']"),
            Locator::css("div[data-value='Vendas']"),
            Locator::text("span", "Vendas"),
        ],
    )
}

fn period_option(period: &Period) -> Step {
    Step::clickable(
        format!("period option '{}'", period.label()),
        vec![
            Locator::css(format!("div[data-value='{}']", period.data_value())),
            Locator::text("span", period.label()),
            Locator::text("span", period.data_value()),
        ],
    )
}

fn date_input(field: DateField) -> Step {
    Step::clickable(
        format!("'{}' date input", field.label()),
        vec![
            Locator::css(format!("input[id='{}']", field.input_id())),
            Locator::text("label", field.label()),
            Locator::text("div", field.label()),
        ],
    )
}

fn year_switch(shown_year: i32) -> Step {
    let year = shown_year.to_string();
    Step::clickable(
        format!("year {year} header"),
        vec![
            Locator::css("button[aria-expanded='false']"),
            Locator::text("button", &year),
            Locator::text("h6", &year),
        ],
    )
}

fn year_option(year: i32) -> Step {
    let year = year.to_string();
    Step::clickable(
        format!("year {year}"),
        vec![Locator::text("button", &year), Locator::text("h6", &year)],
    )
}

fn month_arrow(forward: bool) -> Step {
    let (en, pt) = if forward {
        ("Next month", "Próximo mês")
    } else {
        ("Previous month", "Mês anterior")
    };

    Step::clickable(
        format!("{en} arrow"),
        vec![
            Locator::css(format!("button[aria-label='{en}']")),
            Locator::css(format!("button[aria-label='{pt}']")),
            Locator::css(format!("button[title='{en}']")),
            Locator::css(format!("button[title='{pt}']")),
        ],
    )
}

fn day_cell(day: u32) -> Step {
    Step::clickable(
        format!("day {day}"),
        vec![
            Locator::xpath(format!(
                "//button[@role='gridcell' and normalize-space(text())='{day}']"
            )),
            Locator::xpath(format!(
                "//button[contains(@class, 'MuiPickersDay') and not(contains(@class, 'dayOutsideMonth')) and normalize-space(text())='{day}']"
            )),
            Locator::xpath(format!("//td//button[normalize-space(.)='{day}']")),
        ],
    )
}

/// Month arrow clicks needed to go from the calendar shown on opening
/// (today's month, moved to the target year if the year was switched) to
/// the target month. Negative means backwards.
pub fn month_steps(target: NaiveDate, today: NaiveDate) -> i32 {
    target.month() as i32 - today.month() as i32
}

async fn pick_date(
    page: &dyn PageDriver,
    field: DateField,
    date: NaiveDate,
    today: NaiveDate,
    timing: Timing,
) -> Result<()> {
    let month = month_name(date.month()).unwrap_or_default();
    info!(
        field = field.label(),
        "picking {} de {} de {}",
        date.day(),
        month,
        date.year()
    );

    let quick = timing.brief();
    click_step(page, &date_input(field), quick).await?;

    if date.year() != today.year() {
        click_step(page, &year_switch(today.year()), quick).await?;
        click_step(page, &year_option(date.year()), quick).await?;
    }

    let steps = month_steps(date, today);
    let arrow = month_arrow(steps > 0);
    for _ in 0..steps.unsigned_abs() {
        click_step(page, &arrow, quick).await?;
    }

    click_step(page, &day_cell(date.day()), quick).await?;
    Ok(())
}

/// Selects `period` in the ranking filter; a custom range also fills both
/// date pickers. `today` is the date the pickers open on.
pub async fn select_period(
    page: &dyn PageDriver,
    period: &Period,
    today: NaiveDate,
    timing: Timing,
) -> Result<()> {
    info!(period = %period, "selecting the period");

    click_step(page, &period_toggle(), timing).await?;
    click_step(page, &period_option(period), timing.brief()).await?;

    if let Period::Custom(range) = period {
        pick_date(page, DateField::From, range.from, today, timing).await?;
        pick_date(page, DateField::To, range.to, today, timing).await?;
    }

    log_url(page, "selecting the period").await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Probe;
    use crate::browser::fake::FakePage;
    use crate::dashboard::tests::instant;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_names_are_portuguese() {
        assert_eq!(month_name(1), Some("janeiro"));
        assert_eq!(month_name(3), Some("março"));
        assert_eq!(month_name(12), Some("dezembro"));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
    }

    #[test]
    fn periods_map_to_dropdown_values() {
        assert_eq!(Period::CurrentMonth.data_value(), "CURRENT_MONTH");
        assert_eq!(Period::CurrentWeek.data_value(), "CURRENT_WEEK");
        assert_eq!(Period::LastMonth.data_value(), "LAST_MONTH");
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(Period::Custom(range).data_value(), "DATE");
        assert_eq!(Period::LastMonth.label(), "Mês anterior");
    }

    #[test]
    fn reversed_ranges_are_rejected() {
        assert!(DateRange::new(date(2024, 2, 1), date(2024, 1, 1)).is_err());
        assert!(DateRange::new(date(2024, 1, 1), date(2024, 1, 1)).is_ok());
    }

    #[test]
    fn month_steps_count_from_the_opening_month() {
        let today = date(2025, 6, 19);
        assert_eq!(month_steps(date(2025, 6, 1), today), 0);
        assert_eq!(month_steps(date(2025, 3, 1), today), -3);
        assert_eq!(month_steps(date(2024, 11, 30), today), 5);
    }

    #[tokio::test]
    async fn preset_period_clicks_toggle_then_option() {
        let page = FakePage::new("https://sistema.example.test/ranking");
        page.set(Locator::css("div[data-value='Vendas']"), Probe::Clickable);
        page.set(Locator::css("div[data-value='LAST_MONTH']"), Probe::Clickable);

        select_period(&page, &Period::LastMonth, date(2025, 6, 19), instant())
            .await
            .unwrap();

        assert_eq!(
            page.clicks(),
            vec![
                Locator::css("div[data-value='Vendas']"),
                Locator::css("div[data-value='LAST_MONTH']"),
            ]
        );
    }

    #[tokio::test]
    async fn custom_range_walks_both_pickers() {
        let page = FakePage::new("https://sistema.example.test/ranking");
        page.set(Locator::css("div[id='bc_select_field -toggle']"), Probe::Clickable);
        page.set(Locator::css("div[data-value='DATE']"), Probe::Clickable);
        page.set(Locator::css("input[id='From']"), Probe::Clickable);
        page.set(Locator::css("input[id='To']"), Probe::Clickable);
        page.set(Locator::css("button[aria-expanded='false']"), Probe::Clickable);
        page.set(Locator::text("button", "2024"), Probe::Clickable);
        page.set(Locator::css("button[aria-label='Previous month']"), Probe::Clickable);
        page.set(Locator::css("button[aria-label='Next month']"), Probe::Clickable);
        for day in [1, 31] {
            page.set(
                Locator::xpath(format!(
                    "//button[@role='gridcell' and normalize-space(text())='{day}']"
                )),
                Probe::Clickable,
            );
        }

        let range = DateRange::new(date(2024, 5, 1), date(2024, 7, 31)).unwrap();
        select_period(&page, &Period::Custom(range), date(2025, 6, 19), instant())
            .await
            .unwrap();

        let clicks = page.clicks();
        let prev = Locator::css("button[aria-label='Previous month']");
        let next = Locator::css("button[aria-label='Next month']");
        assert_eq!(clicks[0], Locator::css("div[id='bc_select_field -toggle']"));
        assert_eq!(clicks[1], Locator::css("div[data-value='DATE']"));
        assert_eq!(clicks[2], Locator::css("input[id='From']"));
        assert_eq!(clicks[3], Locator::css("button[aria-expanded='false']"));
        assert_eq!(clicks[4], Locator::text("button", "2024"));
        assert_eq!(clicks[5], prev);
        assert!(clicks.contains(&Locator::css("input[id='To']")));
        assert_eq!(clicks.iter().filter(|c| **c == next).count(), 1);
        assert_eq!(clicks.len(), 12);
    }
}
