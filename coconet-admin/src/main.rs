//! coconet-admin - Operator CLI for the Coconet member and article services
//!
//! Resolves the root folder, opens the SQLite database and runs one
//! command against the member/article services. Logs go to stderr (and
//! optionally a file); command output goes to stdout.

use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use coconet_article::{ArticleDraft, ArticleService, ArticleSummary, SuggestionService};
use coconet_common::config::{
    LoggingConfig, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use coconet_common::db::{init_database, SqliteTagCatalog};
use coconet_common::TagKind;
use coconet_member::{Member, MemberService};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

mod cli;

use cli::{parse_roles, ArticleCommand, Args, Command, MemberCommand};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first: it carries the log level. Its outcome is logged once
    // the subscriber exists.
    let (config, config_source) = TomlConfig::load_or_default(args.config.as_deref());
    init_tracing(&config.logging)?;

    info!("coconet-admin {}", env!("CARGO_PKG_VERSION"));
    config_source.log();

    // Root folder: CLI > env > TOML > platform default
    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&config)
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let members = MemberService::new(pool.clone());
    let articles = ArticleService::new(pool.clone());
    let out = Output { json: args.json };

    match args.command {
        Command::Init => {
            let catalog = SqliteTagCatalog::new(pool);
            let roles = catalog
                .seed_tags(TagKind::Role, config.catalog.names(TagKind::Role))
                .await?;
            let stacks = catalog
                .seed_tags(TagKind::TechStack, config.catalog.names(TagKind::TechStack))
                .await?;
            out.emit(&SeedReport { roles, stacks }, |report| {
                println!(
                    "Catalog ready ({} roles, {} stacks added)",
                    report.roles, report.stacks
                )
            })?;
        }
        Command::Member(command) => run_member(command, &members, &out).await?,
        Command::Article(command) => run_article(command, &members, &articles, &out).await?,
        Command::Suggest { member } => {
            let member = find_member(&members, &member).await?;
            let suggestions = SuggestionService::new(articles, Arc::new(members.clone()));
            let ranked = suggestions.suggestions(member.guid).await?;
            out.emit(&ranked, |ranked| {
                for article in ranked {
                    print_article(article);
                }
            })?;
        }
    }

    Ok(())
}

/// Install the stderr subscriber, plus a file layer when configured
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

async fn run_member(command: MemberCommand, members: &MemberService, out: &Output) -> Result<()> {
    match command {
        MemberCommand::Add { name } => {
            let member = members.create_member(&name).await?;
            out.emit(&member, |m| println!("{}\t{}", m.guid, m.name))?;
        }
        MemberCommand::SetRoles { member, roles } => {
            let member = find_member(members, &member).await?;
            let roles = members.update_roles(member.guid, &roles).await?;
            out.emit(&roles, |roles| println!("roles: {}", roles.join(", ")))?;
        }
        MemberCommand::SetStacks { member, stacks } => {
            let member = find_member(members, &member).await?;
            let stacks = members.update_stacks(member.guid, &stacks).await?;
            out.emit(&stacks, |stacks| println!("stacks: {}", stacks.join(", ")))?;
        }
        MemberCommand::Show { member } => {
            let member = find_member(members, &member).await?;
            let view = MemberView {
                roles: members.roles(member.guid).await?,
                stacks: members.stacks(member.guid).await?,
                member,
            };
            out.emit(&view, |view| {
                println!("{}\t{}", view.member.guid, view.member.name);
                println!("roles: {}", view.roles.join(", "));
                println!("stacks: {}", view.stacks.join(", "));
            })?;
        }
    }
    Ok(())
}

async fn run_article(
    command: ArticleCommand,
    members: &MemberService,
    articles: &ArticleService,
    out: &Output,
) -> Result<()> {
    match command {
        ArticleCommand::Create(create) => {
            let author = find_member(members, &create.author).await?;
            let draft = ArticleDraft {
                author: author.guid,
                title: create.title,
                content: create.content,
                roles: parse_roles(&create.roles)?,
                stacks: create.stacks,
            };
            let article = articles.create_article(draft).await?;
            out.emit(&article, print_article)?;
        }
        ArticleCommand::SetRoles { article, roles } => {
            let article = parse_id(&article)?;
            let roles = articles.update_roles(article, parse_roles(&roles)?).await?;
            out.emit(&roles, |roles| {
                for role in roles {
                    println!("{} x{}", role.name, role.participant);
                }
            })?;
        }
        ArticleCommand::SetStacks { article, stacks } => {
            let article = parse_id(&article)?;
            let stacks = articles.update_stacks(article, &stacks).await?;
            out.emit(&stacks, |stacks| println!("stacks: {}", stacks.join(", ")))?;
        }
        ArticleCommand::Delete { article, requester } => {
            let article = parse_id(&article)?;
            let requester = find_member(members, &requester).await?;
            articles.delete_article(article, requester.guid).await?;
            out.emit(&article, |guid| println!("Deleted {}", guid))?;
        }
        ArticleCommand::Show { article } => {
            let article = articles.summary(parse_id(&article)?).await?;
            out.emit(&article, print_article)?;
        }
        ArticleCommand::Bookmark { article, member } => {
            let article = parse_id(&article)?;
            let member = find_member(members, &member).await?;
            let bookmarked = articles.toggle_bookmark(article, member.guid).await?;
            out.emit(&bookmarked, |bookmarked| {
                let state = if *bookmarked { "Bookmarked" } else { "Removed bookmark" };
                println!("{} {}", state, article)
            })?;
        }
        ArticleCommand::Bookmarks { member } => {
            let member = find_member(members, &member).await?;
            let saved = articles.bookmarks(member.guid).await?;
            out.emit(&saved, |saved| {
                for article in saved {
                    print_article(article);
                }
            })?;
        }
    }
    Ok(())
}

/// Look a member up by id, falling back to name
async fn find_member(members: &MemberService, key: &str) -> Result<Member> {
    if let Ok(guid) = Uuid::parse_str(key) {
        return Ok(members.member(guid).await?);
    }
    members
        .find_by_name(key)
        .await?
        .ok_or_else(|| coconet_common::Error::NotFound(format!("No user found: {}", key)).into())
}

fn parse_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Invalid id '{}'", value))
}

fn print_article(article: &ArticleSummary) {
    let roles: Vec<String> = article
        .roles
        .iter()
        .map(|role| format!("{} x{}", role.name, role.participant))
        .collect();
    println!("{}\t{}", article.guid, article.title);
    println!("  roles: {}", roles.join(", "));
    println!("  stacks: {}", article.stacks.join(", "));
}

#[derive(Serialize)]
struct SeedReport {
    roles: u64,
    stacks: u64,
}

#[derive(Serialize)]
struct MemberView {
    member: Member,
    roles: Vec<String>,
    stacks: Vec<String>,
}

/// Chooses between JSON and plain text output
struct Output {
    json: bool,
}

impl Output {
    fn emit<T: Serialize + ?Sized>(&self, value: &T, text: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text(value);
        }
        Ok(())
    }
}
