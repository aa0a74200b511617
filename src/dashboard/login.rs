use anyhow::{Context, Result};
use std::fmt;
use tracing::{info, warn};

use crate::browser::{Locator, PageDriver, Step, require};
use crate::dashboard::{Timing, click_step, confirm, pause};
use crate::error::StepError;

pub const DEFAULT_LOGIN_URL: &str = "https://sistema.clinicorp.com/login/";

#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

fn user_field() -> Step {
    Step::present(
        "user field",
        vec![
            Locator::css("input[id='username']"),
            Locator::css("input[name='username']"),
            Locator::css("input[name='user']"),
            Locator::css("input[name='email']"),
            Locator::css("input[id='user']"),
            Locator::css("input[id='email']"),
            Locator::css("input[type='text']"),
            Locator::css("input[placeholder*='usuário']"),
            Locator::css("input[placeholder*='email']"),
        ],
    )
}

fn password_field() -> Step {
    Step::present(
        "password field",
        vec![
            Locator::css("input[id='password']"),
            Locator::css("input[name='password']"),
            Locator::css("input[name='passwd']"),
            Locator::css("input[name='pwd']"),
            Locator::css("input[id='passwd']"),
            Locator::css("input[id='pwd']"),
            Locator::css("input[type='password']"),
            Locator::css("input[placeholder*='senha']"),
        ],
    )
}

fn submit_button() -> Step {
    Step::clickable(
        "login button",
        vec![
            Locator::text("button", "Entrar"),
            Locator::css("button[type='submit']"),
            Locator::css("input[type='submit']"),
            Locator::text("button", "Login"),
            Locator::css("input[value='Entrar']"),
            Locator::css("input[value='Login']"),
            Locator::css(".btn-login"),
            Locator::css("#login-button"),
            Locator::css("form button"),
            Locator::css("form input[type='submit']"),
        ],
    )
}

fn logged_in_indicators() -> Vec<Locator> {
    vec![
        Locator::xpath("//*[contains(@class, 'welcome-msg__text--2')]"),
        Locator::xpath("//a[contains(text(), 'Ranking de Unidades')]"),
        Locator::xpath("//a[contains(text(), 'Bom dia!')]"),
        Locator::xpath("//a[contains(text(), 'Logout')]"),
        Locator::xpath("//a[contains(text(), 'Sair')]"),
        Locator::xpath("//*[contains(text(), 'Bem-vindo')]"),
        Locator::xpath("//*[contains(@class, 'user-menu')]"),
        Locator::xpath("//*[contains(@class, 'dashboard')]"),
        Locator::xpath("//*[contains(@class, 'main-content')]"),
    ]
}

fn error_messages() -> Vec<Locator> {
    vec![
        Locator::xpath("//*[contains(text(), 'usuário inválido')]"),
        Locator::xpath("//*[contains(text(), 'senha incorreta')]"),
        Locator::xpath("//*[contains(text(), 'erro')]"),
        Locator::xpath("//*[contains(text(), 'falhou')]"),
        Locator::xpath("//*[contains(@class, 'error')]"),
        Locator::xpath("//*[contains(@class, 'alert-danger')]"),
    ]
}

/// The dashboard leaves the login page on success; staying on it, or
/// landing on an error route, means the credentials were refused.
pub fn login_succeeded(login_url: &str, current_url: &str) -> bool {
    let current = current_url.to_lowercase();

    current_url != login_url
        && !current.contains("login")
        && !current.contains("erro")
        && !current.contains("error")
}

pub async fn login(
    page: &dyn PageDriver,
    login_url: &str,
    credentials: &Credentials,
    timing: Timing,
) -> Result<()> {
    info!(url = login_url, "opening the login page");
    page.goto(login_url).await?;
    pause(timing.before_click * 3).await;

    let user = require(page, &user_field(), timing.wait).await?;
    page.fill(&user.locator, &credentials.user)
        .await
        .context("failed to type the user name")?;
    info!(user = %credentials.user, "user name entered");

    let password = require(page, &password_field(), timing.wait).await?;
    page.fill(&password.locator, &credentials.password)
        .await
        .context("failed to type the password")?;
    info!("password entered");

    click_step(page, &submit_button(), timing).await?;

    let current = page.current_url().await?;
    info!(url = %current, "URL after login");

    if login_succeeded(login_url, &current) {
        info!("logged in");
        confirm(page, "login", &logged_in_indicators()).await;
        return Ok(());
    }

    let messages = collect_messages(page).await;
    if messages.is_empty() {
        warn!("login failed without any error message on the page");
    }

    Err(StepError::LoginRejected {
        url: current,
        messages,
    }
    .into())
}

async fn collect_messages(page: &dyn PageDriver) -> Vec<String> {
    let mut messages = Vec::new();

    for locator in error_messages() {
        match page.text_of(&locator).await {
            Ok(Some(text)) if !text.is_empty() => {
                warn!(message = %text, "error message on the login page");
                if !messages.contains(&text) {
                    messages.push(text);
                }
            }
            Ok(_) => {}
            Err(e) => warn!(%locator, error = %e, "could not read error message"),
        }
    }

    messages
}
