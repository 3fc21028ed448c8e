use anyhow::{anyhow, Context, Result};

use casefeed::cli::{Command, Flags};
use casefeed::controllers::{post_controller, start_app};
use casefeed::models::Config;
use casefeed::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    //Get Flags
    let flags = Flags::from_args();

    let _log_guard = telemetry::init_logging();

    let mut config = Config::load().context("Failed to load configuration")?;
    flags.apply_to(&mut config);

    let feed = post_controller::init_feed(&config, flags.ephemeral).await?;

    match flags.command() {
        Command::Browse => start_app(feed).await?,
        Command::List => post_controller::list_posts(&feed).await,
        Command::Show => {
            let post_id = flags
                .post_id
                .as_deref()
                .ok_or_else(|| anyhow!("`show` needs a post id, see `casefeed list`"))?;
            post_controller::show_post(&feed, post_id).await?
        }
        Command::Reset => post_controller::reset(&feed).await?,
    }
    Ok(())
}
