//! Command-line interface definitions.
//!
//! One binary, a handful of subcommands: the recurring pipeline (`run`) plus
//! one-shot operator actions that mirror what the scheduler does, and the
//! administrative post-deletion flow.

use clap::{Parser, Subcommand, ValueEnum};

/// Scrape configured news sites and republish new articles to Facebook
/// pages and Instagram profiles.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "PAPERBOY_CONFIG", default_value = "paperboy.json")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one ingestion pass over all configured sources
    Ingest,
    /// Run one auto-publish sweep over today's unpublished articles
    Sweep,
    /// Run the recurring ingestion and sweep schedules
    Run,
    /// Publish one article to selected destinations right now
    Publish {
        /// Article row id
        #[arg(long)]
        article_id: i64,
        /// Facebook page config id (repeatable)
        #[arg(long = "facebook-page")]
        facebook_pages: Vec<i64>,
        /// Instagram profile config id (repeatable)
        #[arg(long = "instagram-profile")]
        instagram_profiles: Vec<i64>,
    },
    /// Delete a post record and reconcile the article's posted flag.
    /// For Facebook the remote post is deleted best-effort first.
    DeletePost {
        #[arg(long, value_enum)]
        platform: PlatformArg,
        /// Post record id
        #[arg(long)]
        id: i64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformArg {
    Facebook,
    Instagram,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_shot_subcommands() {
        let cli = Cli::parse_from(&["paperboy", "--config", "/etc/paperboy.json", "ingest"]);
        assert_eq!(cli.config, "/etc/paperboy.json");
        assert!(matches!(cli.command, Command::Ingest));

        let cli = Cli::parse_from(&["paperboy", "sweep"]);
        assert_eq!(cli.config, "paperboy.json");
        assert!(matches!(cli.command, Command::Sweep));
    }

    #[test]
    fn parses_manual_publish_with_repeated_destinations() {
        let cli = Cli::parse_from(&[
            "paperboy",
            "publish",
            "--article-id",
            "12",
            "--facebook-page",
            "1",
            "--facebook-page",
            "2",
            "--instagram-profile",
            "1",
        ]);
        match cli.command {
            Command::Publish {
                article_id,
                facebook_pages,
                instagram_profiles,
            } => {
                assert_eq!(article_id, 12);
                assert_eq!(facebook_pages, vec![1, 2]);
                assert_eq!(instagram_profiles, vec![1]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_delete_post() {
        let cli = Cli::parse_from(&[
            "paperboy",
            "delete-post",
            "--platform",
            "facebook",
            "--id",
            "3",
        ]);
        match cli.command {
            Command::DeletePost { platform, id } => {
                assert_eq!(platform, PlatformArg::Facebook);
                assert_eq!(id, 3);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
