//! Key, account, queue, archive and domain management

use anyhow::{Context, Result};
use clap::Subcommand;
use uuid::Uuid;

use newsloom::llm::ProviderKind;
use newsloom::models::{AccountCredentials, FacebookTarget, SocialAccount};
use newsloom::publisher::{PlatformPublisher, Publisher};
use newsloom::storage::AppState;
use newsloom::utils::{extract_domain, truncate_text};

use super::Workspace;

// ============================================================================
// Keys
// ============================================================================

#[derive(Subcommand)]
pub enum KeysCommand {
    /// Add an API key to a provider's rotation
    Add {
        /// Provider (gemini, groq, huggingface)
        #[arg(short, long, default_value = "gemini")]
        provider: String,

        /// Label shown in listings
        #[arg(short, long)]
        name: Option<String>,

        /// The key itself
        secret: String,
    },

    /// Remove a key by id
    Remove { id: Uuid },

    /// List keys per provider
    List,

    /// Make the next key active
    Rotate {
        #[arg(short, long, default_value = "gemini")]
        provider: String,
    },
}

fn provider_id(name: &str) -> Result<&'static str> {
    let provider: ProviderKind = name
        .parse()
        .with_context(|| format!("Unknown provider: {name}"))?;
    Ok(provider.id())
}

/// `abcd****wxyz`
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}

pub fn keys(workspace: &mut Workspace, command: KeysCommand) -> Result<()> {
    let changed = run_keys(&mut workspace.state, command)?;
    if changed {
        workspace.save()?;
    }
    Ok(())
}

fn run_keys(state: &mut AppState, command: KeysCommand) -> Result<bool> {
    match command {
        KeysCommand::Add {
            provider,
            name,
            secret,
        } => {
            let provider = provider_id(&provider)?;
            let count = state.keys.keys(provider).len();
            let name = name.unwrap_or_else(|| format!("{provider} key {}", count + 1));
            let id = state.keys.add(provider, secret, name);
            println!("Added {provider} key {id}");
            Ok(true)
        }
        KeysCommand::Remove { id } => {
            let Some(provider) = state.keys.provider_of(id).map(str::to_string) else {
                anyhow::bail!("No key with id {id}");
            };
            state.keys.remove(&provider, id);
            println!("Removed {provider} key {id}");
            Ok(true)
        }
        KeysCommand::List => {
            let providers: Vec<String> = state.keys.providers().map(str::to_string).collect();
            if providers.iter().all(|p| state.keys.keys(p).is_empty()) {
                println!("No API keys configured");
                return Ok(false);
            }
            for provider in providers {
                let cursor = state.keys.cursor(&provider);
                println!("{provider}:");
                for (index, key) in state.keys.keys(&provider).iter().enumerate() {
                    let marker = if index == cursor { "*" } else { " " };
                    let last_used = key
                        .last_used_at
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "never".to_string());
                    println!(
                        "  {marker} {} {} [{}] uses: {} last: {last_used}",
                        key.id,
                        key.display_name,
                        mask_secret(&key.secret),
                        key.usage_count
                    );
                }
            }
            Ok(false)
        }
        KeysCommand::Rotate { provider } => {
            let provider = provider_id(&provider)?;
            if !state.keys.rotate(provider) {
                println!("Nothing to rotate: {provider} has fewer than two keys");
                return Ok(false);
            }
            if let Some(active) = state.keys.active(provider) {
                println!("Active {provider} key is now {}", active.display_name);
            }
            Ok(true)
        }
    }
}

// ============================================================================
// Accounts
// ============================================================================

#[derive(Subcommand)]
pub enum AccountsCommand {
    /// Add a Twitter/X account (OAuth 2.0 user access token)
    AddTwitter {
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        access_token: String,
    },

    /// Add a Facebook page or group
    AddFacebook {
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        access_token: String,
        /// Page or group id
        #[arg(long)]
        page_id: String,
        /// Post to a group instead of a page
        #[arg(long, default_value = "false")]
        group: bool,
    },

    /// Add a Telegram channel or chat
    AddTelegram {
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        bot_token: String,
        /// `@channel` or numeric chat id
        #[arg(long)]
        chat_id: String,
    },

    /// Remove an account by id
    Remove { id: Uuid },

    /// List accounts
    List,

    /// Check every account's credentials against its platform
    Verify,
}

pub async fn accounts(workspace: &mut Workspace, command: AccountsCommand) -> Result<()> {
    if let AccountsCommand::Verify = command {
        let publisher = PlatformPublisher::new(workspace.config.publish_timeout())
            .context("Failed to create publisher")?;
        return verify_accounts(&publisher, &workspace.state.accounts).await;
    }

    if run_accounts(&mut workspace.state, command)? {
        workspace.save()?;
    }
    Ok(())
}

async fn verify_accounts(publisher: &dyn Publisher, accounts: &[SocialAccount]) -> Result<()> {
    if accounts.is_empty() {
        println!("No accounts configured");
        return Ok(());
    }
    let mut failures = 0;
    for account in accounts {
        match publisher.verify(account).await {
            Ok(identity) => println!("  OK   {} ({}) as {identity}", account.name, account.platform()),
            Err(e) => {
                failures += 1;
                println!("  FAIL {} ({}): {e}", account.name, account.platform());
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} account(s) failed verification");
    }
    Ok(())
}

fn run_accounts(state: &mut AppState, command: AccountsCommand) -> Result<bool> {
    let account = match command {
        AccountsCommand::AddTwitter { name, access_token } => {
            SocialAccount::new(name, AccountCredentials::Twitter { access_token })
        }
        AccountsCommand::AddFacebook {
            name,
            access_token,
            page_id,
            group,
        } => SocialAccount::new(
            name,
            AccountCredentials::Facebook {
                access_token,
                page_id,
                target: if group {
                    FacebookTarget::Group
                } else {
                    FacebookTarget::Page
                },
            },
        ),
        AccountsCommand::AddTelegram {
            name,
            bot_token,
            chat_id,
        } => SocialAccount::new(name, AccountCredentials::Telegram { bot_token, chat_id }),
        AccountsCommand::Remove { id } => {
            let before = state.accounts.len();
            state.accounts.retain(|a| a.id != id);
            if state.accounts.len() == before {
                anyhow::bail!("No account with id {id}");
            }
            println!("Removed account {id}");
            return Ok(true);
        }
        AccountsCommand::List => {
            if state.accounts.is_empty() {
                println!("No accounts configured");
            }
            for account in &state.accounts {
                println!("  {} {} ({})", account.id, account.name, account.platform());
            }
            return Ok(false);
        }
        AccountsCommand::Verify => return Ok(false),
    };

    println!(
        "Added {} account {} ({})",
        account.platform(),
        account.name,
        account.id
    );
    state.accounts.push(account);
    Ok(true)
}

// ============================================================================
// Queue
// ============================================================================

#[derive(Subcommand)]
pub enum QueueCommand {
    /// List queued posts in order
    List,

    /// Remove a post
    Remove { id: Uuid },

    /// Return a failed post to pending
    Requeue { id: Uuid },

    /// Move a post from one position to another (0-based)
    Move { from: usize, to: usize },
}

pub fn queue(workspace: &mut Workspace, command: QueueCommand) -> Result<()> {
    if run_queue(&mut workspace.state, command)? {
        workspace.save()?;
    }
    Ok(())
}

fn run_queue(state: &mut AppState, command: QueueCommand) -> Result<bool> {
    let queue = &mut state.queue;
    match command {
        QueueCommand::List => {
            if queue.is_empty() {
                println!("Queue is empty");
            }
            for (index, post) in queue.posts().iter().enumerate() {
                println!(
                    "{index:>3}. [{:<10}] {} {}",
                    post.status.as_str(),
                    post.id,
                    truncate_text(&post.title, 70)
                );
            }
            Ok(false)
        }
        QueueCommand::Remove { id } => {
            let post = queue
                .remove(id)
                .with_context(|| format!("No post with id {id}"))?;
            println!("Removed post: {}", post.title);
            Ok(true)
        }
        QueueCommand::Requeue { id } => {
            if !queue.requeue(id) {
                anyhow::bail!("Post {id} does not exist or has not failed");
            }
            println!("Post {id} is pending again");
            Ok(true)
        }
        QueueCommand::Move { from, to } => {
            if !queue.reorder(from, to) {
                anyhow::bail!("Positions out of range (queue has {} posts)", queue.len());
            }
            println!("Moved post {from} to {to}");
            Ok(true)
        }
    }
}

// ============================================================================
// Archive
// ============================================================================

#[derive(Subcommand)]
pub enum ArchiveCommand {
    /// Show the newest archived articles
    List {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Check whether a title and content would be treated as a duplicate
    Check {
        #[arg(short, long)]
        title: String,
        #[arg(short, long, default_value = "")]
        content: String,
    },

    /// Remove every archived article
    Clear,
}

pub fn archive(workspace: &mut Workspace, command: ArchiveCommand) -> Result<()> {
    if run_archive(&mut workspace.state, command) {
        workspace.save()?;
    }
    Ok(())
}

fn run_archive(state: &mut AppState, command: ArchiveCommand) -> bool {
    let archive = &mut state.archive;
    match command {
        ArchiveCommand::List { limit } => {
            println!("{} archived article(s)", archive.len());
            for article in archive.recent(limit) {
                println!(
                    "  {} [{}] {}",
                    article.archived_at.format("%Y-%m-%d %H:%M"),
                    article.source,
                    truncate_text(&article.title, 70)
                );
            }
            false
        }
        ArchiveCommand::Check { title, content } => {
            match archive.find_duplicate(&title, &content) {
                Some(m) => println!(
                    "Duplicate of \"{}\" (title {:.2}, content {:.2})",
                    m.article.title, m.title_similarity, m.content_similarity
                ),
                None => println!("No duplicate found"),
            }
            false
        }
        ArchiveCommand::Clear => {
            let count = archive.len();
            archive.clear();
            println!("Cleared {count} archived article(s)");
            true
        }
    }
}

// ============================================================================
// Excluded domains
// ============================================================================

#[derive(Subcommand)]
pub enum DomainsCommand {
    /// Exclude a domain (subdomains included)
    Add { domain: String },

    /// Stop excluding a domain
    Remove { domain: String },

    /// List excluded domains
    List,
}

/// Accept bare hosts or full URLs; returns the lowercase host without "www."
fn normalize_domain(input: &str) -> Result<String> {
    let input = input.trim();
    if input.contains("://") {
        return extract_domain(input);
    }
    let host = input
        .split('/')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if host.is_empty() {
        anyhow::bail!("Empty domain");
    }
    Ok(host)
}

pub fn domains(workspace: &mut Workspace, command: DomainsCommand) -> Result<()> {
    if run_domains(&mut workspace.state, command)? {
        workspace.save()?;
    }
    Ok(())
}

fn run_domains(state: &mut AppState, command: DomainsCommand) -> Result<bool> {
    let domains = &mut state.excluded_domains;
    match command {
        DomainsCommand::Add { domain } => {
            let domain = normalize_domain(&domain)?;
            if domains.contains(&domain) {
                println!("{domain} is already excluded");
                return Ok(false);
            }
            println!("Excluding {domain}");
            domains.push(domain);
            Ok(true)
        }
        DomainsCommand::Remove { domain } => {
            let domain = normalize_domain(&domain)?;
            let before = domains.len();
            domains.retain(|d| d != &domain);
            if domains.len() == before {
                anyhow::bail!("{domain} is not excluded");
            }
            println!("No longer excluding {domain}");
            Ok(true)
        }
        DomainsCommand::List => {
            if domains.is_empty() {
                println!("No excluded domains");
            }
            for domain in domains.iter() {
                println!("  {domain}");
            }
            Ok(false)
        }
    }
}
