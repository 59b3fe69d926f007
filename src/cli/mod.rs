//! Command-line surface: argument definitions plus the handlers in [`commands`].
pub mod commands;
pub mod render;

use clap::{Args, Parser, Subcommand};
use newsdesk::collection::SortKey;
use newsdesk::config::BASE_URL_ENV;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "newsdesk", about = "Terminal client for the newsdesk article CMS", version)]
pub struct Cli {
    /// API base URL (overrides the config file)
    #[arg(long, env = BASE_URL_ENV, global = true)]
    pub base_url: Option<String>,

    /// Config file (default: ~/.config/newsdesk/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the session locally
    Login {
        username: String,
        /// Prompted for when omitted
        #[arg(long, env = "NEWSDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        username: String,
        #[arg(long, env = "NEWSDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Admin or User
        #[arg(long, default_value = "User")]
        role: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in profile
    Profile,
    /// Manage articles (Admin)
    #[command(subcommand)]
    Articles(ArticlesCommand),
    /// Manage categories (Admin)
    #[command(subcommand)]
    Categories(CategoriesCommand),
    /// Browse published articles
    #[command(subcommand)]
    Read(ReadCommand),
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Match title or content, case-insensitive
    #[arg(short, long, default_value = "")]
    pub query: String,

    /// Exact category name
    #[arg(short, long)]
    pub category: Option<String>,

    /// newest or title
    #[arg(long, default_value_t = SortKey::Newest)]
    pub sort: SortKey,

    #[arg(short, long, default_value_t = 1)]
    pub page: usize,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ArticleArgs {
    #[arg(long)]
    pub title: Option<String>,

    /// Category id
    #[arg(long)]
    pub category: Option<String>,

    /// HTML body
    #[arg(long, conflicts_with = "content_file")]
    pub content: Option<String>,

    /// Read the HTML body from a file
    #[arg(long, value_name = "FILE")]
    pub content_file: Option<PathBuf>,

    /// Image file to upload as the thumbnail
    #[arg(long, value_name = "FILE", conflicts_with = "image_url")]
    pub thumbnail: Option<PathBuf>,

    /// Already-hosted thumbnail URL
    #[arg(long)]
    pub image_url: Option<String>,

    /// Save as a preview draft instead of publishing
    #[arg(long)]
    pub preview: bool,
}

#[derive(Subcommand, Debug)]
pub enum ArticlesCommand {
    List(ListArgs),
    Show {
        id: String,
    },
    Create(ArticleArgs),
    /// Edit an article; omitted fields keep their current values
    Edit {
        id: String,
        #[command(flatten)]
        args: ArticleArgs,
    },
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show, submit or discard the saved preview draft
    Preview {
        #[arg(long, conflicts_with = "discard")]
        submit: bool,
        #[arg(long)]
        discard: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CategoriesCommand {
    List {
        #[arg(short, long, default_value = "")]
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    Create {
        name: String,
    },
    Rename {
        id: String,
        name: String,
    },
    Delete {
        id: String,
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReadCommand {
    List(ListArgs),
    /// Article detail plus recommendations
    Show {
        id: String,
    },
}
