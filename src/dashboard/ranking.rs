use anyhow::Result;
use tracing::info;

use crate::browser::{Locator, PageDriver, Step};
use crate::dashboard::{Timing, click_step, confirm, log_url};

fn ranking_entry() -> Step {
    Step::clickable(
        "Ranking de Unidades",
        vec![
            Locator::css("div[id='Ranking de Unidades']"),
            Locator::css("input[id='Ranking de Unidades']"),
        ],
    )
}

fn list_button() -> Step {
    Step::clickable(
        "Listar button",
        vec![
            Locator::text("button", "Listar"),
            Locator::text("span", "Listar"),
            Locator::text("button", "play_circle_filled"),
            Locator::text("span", "play_circle_filled"),
        ],
    )
}

/// Opens the "Ranking de Unidades" screen from the dashboard menu.
pub async fn open_ranking(page: &dyn PageDriver, timing: Timing) -> Result<()> {
    info!("opening Ranking de Unidades");
    click_step(page, &ranking_entry(), timing).await?;

    confirm(
        page,
        "Ranking de Unidades screen",
        &[
            Locator::xpath("//div[contains(text(), 'Período')]"),
            Locator::xpath("//label[contains(text(), 'Período')]"),
        ],
    )
    .await;
    log_url(page, "opening Ranking de Unidades").await;

    Ok(())
}

/// Runs the ranking listing for the filters currently selected.
pub async fn list_ranking(page: &dyn PageDriver, timing: Timing) -> Result<()> {
    info!("listing the ranking");
    click_step(page, &list_button(), timing).await?;

    confirm(
        page,
        "ranking table",
        &[
            Locator::xpath("//div[contains(@class, 'ReactTable -striped -highlight')]"),
            Locator::xpath("//div[contains(@class, 'rt-table visible')]"),
        ],
    )
    .await;
    log_url(page, "listing the ranking").await;

    Ok(())
}
