use colored::*;
use std::env;

/// Run startup checks to ensure the user has all required configuration
pub fn run_onboarding_checks() -> Result<(), OnboardingError> {
    run_checks(|key| env::var(key).ok())
}

fn run_checks<F>(lookup: F) -> Result<(), OnboardingError>
where
    F: Fn(&str) -> Option<String>,
{
    println!("{}", "=".repeat(60).bright_cyan());
    println!("{}", "  P2Pool Mini Discord Bot - Initialization".bright_cyan().bold());
    println!("{}", "=".repeat(60).bright_cyan());
    println!();

    // Check 1: Discord token
    check_discord_token(&lookup)?;

    // Check 2: Notification channel
    check_notification_channel(&lookup)?;

    println!("{}", "✓ All configuration checks passed!".green().bold());
    println!();

    Ok(())
}

fn check_discord_token<F>(lookup: &F) -> Result<(), OnboardingError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup("DISCORD_TOKEN") {
        Some(token) if !token.trim().is_empty() => {
            println!("{} Discord token found", "✓".green());
            Ok(())
        }
        _ => Err(OnboardingError::MissingDiscordToken),
    }
}

fn check_notification_channel<F>(lookup: &F) -> Result<(), OnboardingError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup("NOTIFICATION_CHANNEL_ID").filter(|v| !v.trim().is_empty()) {
        None => {
            println!(
                "{} NOTIFICATION_CHANNEL_ID not set, block notifications disabled",
                "⚠".yellow()
            );
            Ok(())
        }
        Some(raw) if raw.trim().parse::<u64>().is_ok() => {
            println!("{} Notification channel {}", "✓".green(), raw.trim().cyan());
            Ok(())
        }
        Some(raw) => Err(OnboardingError::InvalidChannelId(raw)),
    }
}

#[derive(Debug)]
pub enum OnboardingError {
    MissingDiscordToken,
    InvalidChannelId(String),
}

impl std::fmt::Display for OnboardingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OnboardingError::MissingDiscordToken => {
                writeln!(f)?;
                writeln!(f, "{}", "[!] CONFIGURATION ERROR: Discord Token Not Found".red().bold())?;
                writeln!(f, "{}", "-".repeat(60).red())?;
                writeln!(f, "The bot cannot log in to Discord without a bot token.")?;
                writeln!(f)?;
                writeln!(f, "{}", ">> ACTION REQUIRED:".yellow().bold())?;
                writeln!(f, "1. Create a file named {} in the project root folder.", "'.env'".cyan())?;
                writeln!(f, "2. Open {} and select your application.", "https://discord.com/developers/applications".cyan())?;
                writeln!(f, "3. Under {}, reset and copy the token.", "Bot".cyan())?;
                writeln!(f, "4. Add this line to the '.env' file:")?;
                writeln!(f, "   {}", "DISCORD_TOKEN=your_token_here".cyan())?;
                writeln!(f, "{}", "-".repeat(60).red())?;
                Ok(())
            }
            OnboardingError::InvalidChannelId(raw) => {
                writeln!(f)?;
                writeln!(f, "{}", "[!] CONFIGURATION ERROR: Invalid Notification Channel".red().bold())?;
                writeln!(f, "{}", "-".repeat(60).red())?;
                writeln!(f, "NOTIFICATION_CHANNEL_ID is '{}', which is not a channel ID.", raw.yellow())?;
                writeln!(f)?;
                writeln!(f, "{}", ">> ACTION REQUIRED:".yellow().bold())?;
                writeln!(f, "1. Enable {} in Discord's advanced settings.", "Developer Mode".cyan())?;
                writeln!(f, "2. Right-click the channel and choose {}.", "Copy Channel ID".cyan())?;
                writeln!(f, "3. Set {} in '.env', or remove the line", "NOTIFICATION_CHANNEL_ID=<number>".cyan())?;
                writeln!(f, "   to run without block notifications.")?;
                writeln!(f, "{}", "-".repeat(60).red())?;
                Ok(())
            }
        }
    }
}

impl std::error::Error for OnboardingError {}
