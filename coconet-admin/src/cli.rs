//! Command-line definitions

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use coconet_common::catalog::RequestedTag;
use coconet_common::tags::Participants;
use std::path::PathBuf;

/// Participant count used when a role is given without one
const DEFAULT_PARTICIPANTS: Participants = 1;

/// Command-line arguments for coconet-admin
#[derive(Parser, Debug)]
#[command(name = "coconet-admin")]
#[command(about = "Manage Coconet members, articles and suggestions")]
#[command(version)]
pub struct Args {
    /// Root folder holding the database (overrides env and config file)
    #[arg(short, long, global = true)]
    pub root_folder: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "COCONET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database and seed the role/stack catalog
    Init,

    /// Member management
    #[command(subcommand)]
    Member(MemberCommand),

    /// Article management
    #[command(subcommand)]
    Article(ArticleCommand),

    /// Ranked article suggestions for a member
    Suggest {
        /// Member name or id
        member: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    /// Register a member
    Add { name: String },

    /// Replace a member's roles
    SetRoles {
        /// Member name or id
        member: String,
        #[arg(required = true)]
        roles: Vec<String>,
    },

    /// Replace a member's stacks
    SetStacks {
        /// Member name or id
        member: String,
        #[arg(required = true)]
        stacks: Vec<String>,
    },

    /// Show a member with roles and stacks
    Show {
        /// Member name or id
        member: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ArticleCommand {
    /// Post an article
    Create(CreateArticle),

    /// Replace an article's roles (NAME or NAME:PARTICIPANTS)
    SetRoles {
        article: String,
        roles: Vec<String>,
    },

    /// Replace an article's stacks
    SetStacks {
        article: String,
        stacks: Vec<String>,
    },

    /// Delete an article on behalf of its author
    Delete {
        article: String,
        /// Member name or id of the requester
        #[arg(long = "as")]
        requester: String,
    },

    /// Show an article with its tags
    Show { article: String },

    /// Bookmark an article, or remove an existing bookmark
    Bookmark {
        article: String,
        /// Member name or id
        #[arg(long = "as")]
        member: String,
    },

    /// List a member's bookmarked articles
    Bookmarks {
        /// Member name or id
        member: String,
    },
}

#[derive(ClapArgs, Debug)]
pub struct CreateArticle {
    /// Author name or id
    #[arg(long)]
    pub author: String,

    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub content: String,

    /// Role to recruit for, NAME or NAME:PARTICIPANTS (repeatable)
    #[arg(long = "role")]
    pub roles: Vec<String>,

    /// Stack used (repeatable)
    #[arg(long = "stack")]
    pub stacks: Vec<String>,
}

/// Parse `NAME` or `NAME:PARTICIPANTS`
pub fn parse_role(value: &str) -> Result<RequestedTag<Participants>> {
    let (name, participants) = match value.rsplit_once(':') {
        Some((name, count)) => {
            let count = count
                .trim()
                .parse::<Participants>()
                .with_context(|| format!("Invalid participant count in '{}'", value))?;
            (name.trim(), count)
        }
        None => (value.trim(), DEFAULT_PARTICIPANTS),
    };

    if name.is_empty() {
        bail!("Empty role name in '{}'", value);
    }
    Ok(RequestedTag::with_attribute(name, participants))
}

pub fn parse_roles(values: &[String]) -> Result<Vec<RequestedTag<Participants>>> {
    values.iter().map(|value| parse_role(value)).collect()
}
