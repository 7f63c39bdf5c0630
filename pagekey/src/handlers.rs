use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::ArgMatches;
use colored::Colorize;
use pagekey_core::{
    AutofillService, DEFAULT_DB_NAME, Database, FillResponse, SaveOutcome, SimilarSitePolicy,
    Upsert,
};
use pagekey_engine::{ViewTree, classify, compat, identify, title};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/pagekey/";

// Helper functions shared by the handlers

/// Location of the database inside a config directory, with `~` expanded.
pub fn database_path(config_dir: &str) -> PathBuf {
    let expanded = shellexpand::tilde(config_dir);
    Path::new(expanded.as_ref()).join(DEFAULT_DB_NAME)
}

/// The `--db` override if given, otherwise the default location.
pub fn resolve_db_path(db: Option<&Path>) -> PathBuf {
    match db {
        Some(path) => PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref()),
        None => database_path(DEFAULT_CONFIG_DIR),
    }
}

pub fn open_database(path: &Path) -> anyhow::Result<Arc<Database>> {
    if !Database::exists(path) {
        bail!(
            "No database at {}. Run `pagekey init` first.",
            path.display()
        );
    }
    let db = Database::new(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    Ok(Arc::new(db))
}

/// Load a view snapshot from disk
pub fn load_tree(path: &Path) -> Result<ViewTree, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read snapshot {}: {}", path.display(), e))?;
    ViewTree::from_json(&content)
        .map_err(|e| format!("Failed to parse snapshot {}: {}", path.display(), e))
}

pub fn parse_policy(args: &ArgMatches) -> Result<SimilarSitePolicy, String> {
    match args.try_get_one::<String>("on-similar") {
        Ok(Some(raw)) => raw.parse(),
        _ => Ok(SimilarSitePolicy::default()),
    }
}

pub fn mask_password(password: &str) -> String {
    "•".repeat(password.chars().count().clamp(4, 12))
}

pub fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn snapshot_from(args: &ArgMatches) -> anyhow::Result<ViewTree> {
    let path = args
        .get_one::<PathBuf>("SNAPSHOT")
        .context("A snapshot path is required")?;
    load_tree(path).map_err(anyhow::Error::msg)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_header(title: &str) {
    print_divider();
    println!("  {}", title.bright_white().bold());
    print_divider();
    println!();
}

fn print_prompt(msg: &str) -> io::Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

pub fn handle_init(args: &ArgMatches) -> anyhow::Result<()> {
    print_header("PAGEKEY INITIALIZATION");

    let config_dir = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_DIR);
    let force = args.get_flag("force");
    let db_path = database_path(config_dir);

    println!("{} Parsed arguments", "✓".green().bold());
    println!(
        "{} Target: {}",
        "→".blue(),
        db_path.display().to_string().bright_white()
    );
    println!();

    if Database::exists(&db_path) && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("A database already exists:");
        println!(
            "  {} {}",
            "•".yellow(),
            db_path.display().to_string().bright_white()
        );
        println!();
        println!(
            "{}",
            "Recreating it deletes every stored site and credential.".yellow()
        );

        let response = print_prompt("Do you want to continue? [y/N]:")?;
        println!();

        if response != "y" && response != "yes" {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return Ok(());
        }
        println!("{} Proceeding with overwrite", "→".yellow().bold());
        println!();
    }

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
        println!("{} Config directory ready", "✓".green().bold());
    }

    if Database::exists(&db_path) {
        Database::drop(&db_path)?;
        println!("{} Removed existing database", "✓".green().bold());
    }

    Database::new(&db_path)?;
    println!("{} Database created", "✓".green().bold());
    println!();
    print_divider();
    println!(
        "{} {}",
        "✓".green().bold(),
        "Initialization complete!".green().bold()
    );
    print_divider();
    Ok(())
}

pub fn handle_identify(args: &ArgMatches) -> anyhow::Result<()> {
    let tree = snapshot_from(args)?;
    let page = identify(&tree);
    let mut fields = classify(&tree);

    let bank = page.domain.as_deref().and_then(compat::lookup);
    if let (Some(domain), Some(_)) = (page.domain.as_deref(), bank) {
        fields = compat::enhance(domain, &fields);
    }
    let display = title::display_title(&tree, &page);

    if args.get_flag("json") {
        let out = serde_json::json!({
            "page": page,
            "title": display,
            "fields": fields,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_header("PAGE IDENTIFICATION");
    println!("{} Page id: {}", "→".blue(), page.page_id.bright_white());
    println!("{} Title:   {}", "→".blue(), display.bright_white());
    match (&page.domain, &page.url) {
        (Some(domain), Some(url)) => {
            println!("{} Domain:  {}", "→".blue(), domain.bright_white());
            println!("{} URL:     {}", "→".blue(), url.bright_white());
        }
        _ => println!(
            "{} No domain found, page id derived from form structure",
            "⚠".yellow()
        ),
    }
    if let Some(bank) = bank {
        println!(
            "{} Site-specific rules applied: {}",
            "✓".green().bold(),
            bank.name.bright_white()
        );
    }
    println!();

    if fields.is_empty() {
        println!("{} No autofillable fields", "⚠".yellow());
    } else {
        println!("{}", "Fields".bright_white().bold());
        for field in &fields {
            println!(
                "  {} {:<24} {:<14} {}",
                "•".cyan(),
                field.id.as_str(),
                field.role.as_str().bright_green(),
                field.text.as_deref().unwrap_or("").dimmed()
            );
        }
    }
    println!();
    print_divider();
    Ok(())
}

pub async fn handle_fill(args: &ArgMatches, db_path: &Path) -> anyhow::Result<()> {
    let tree = snapshot_from(args)?;
    let policy = parse_policy(args).map_err(anyhow::Error::msg)?;
    let db = open_database(db_path)?;
    let service = AutofillService::new(db).with_policy(policy);

    let Some(response) = service.fill(&tree).await else {
        println!("{} No autofillable fields in snapshot", "⚠".yellow());
        return Ok(());
    };

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    print_fill(&response);
    Ok(())
}

fn print_fill(response: &FillResponse) {
    print_header("AUTOFILL");
    println!("{} Page:  {}", "→".blue(), response.title.bright_white());
    if let Some(site) = &response.site {
        println!(
            "{} Site:  {} {}",
            "→".blue(),
            site.name.bright_white(),
            format!("(#{})", site.id).dimmed()
        );
    }
    println!(
        "{} {} fields, {} suggestions",
        "→".blue(),
        response.fields.len(),
        response.datasets.len()
    );
    println!();

    for dataset in &response.datasets {
        println!("  {} {}", "•".cyan(), dataset.label.bright_white());
        for (field, value) in &dataset.values {
            let shown = if response
                .fields
                .iter()
                .any(|f| &f.id == field && f.role.as_str() == "password")
            {
                mask_password(value)
            } else {
                value.clone()
            };
            println!("      {} = {}", field.as_str().dimmed(), shown);
        }
    }

    if let Some(save_info) = &response.save_info {
        println!();
        println!(
            "{} Watching {} fields for save",
            "→".blue(),
            save_info.fields.len()
        );
    }
    println!();
    print_divider();
}

pub async fn handle_save(args: &ArgMatches, db_path: &Path) -> anyhow::Result<()> {
    let tree = snapshot_from(args)?;
    let policy = parse_policy(args).map_err(anyhow::Error::msg)?;
    let db = open_database(db_path)?;
    let service = AutofillService::new(db).with_policy(policy);

    match service.save(&tree).await {
        SaveOutcome::Saved { site, stored } => {
            println!(
                "{} Saved for {} {}",
                "✓".green().bold(),
                site.name.bright_white(),
                format!("(#{})", site.id).dimmed()
            );
            for upsert in stored {
                let verb = match upsert {
                    Upsert::Inserted(_) => "inserted",
                    Upsert::Updated(_) => "updated",
                    Upsert::Touched(_) => "unchanged",
                };
                println!("  {} credential #{} {}", "•".cyan(), upsert.id(), verb);
            }
            Ok(())
        }
        SaveOutcome::NothingToSave => {
            println!("{} No username/password pair to save", "⚠".yellow());
            Ok(())
        }
        SaveOutcome::Failed(reason) => bail!("Save failed: {}", reason),
    }
}

pub fn handle_site_list(db_path: &Path) -> anyhow::Result<()> {
    let db = open_database(db_path)?;
    let sites = db.all_sites()?;

    print_header("SITES");
    if sites.is_empty() {
        println!("{} No sites yet", "⚠".yellow());
    }
    for site in &sites {
        println!(
            "  {} {:<5} {:<30} {}",
            "•".cyan(),
            format!("#{}", site.id).bright_white(),
            site.name.bright_white().bold(),
            site.page_id.dimmed()
        );
        println!(
            "        last used {}{}",
            format_timestamp(site.last_used),
            if site.is_user_named { ", named by user" } else { "" }
        );
    }
    println!();
    print_divider();
    Ok(())
}

pub fn handle_site_rename(args: &ArgMatches, db_path: &Path) -> anyhow::Result<()> {
    let id = *args.get_one::<i64>("id").context("--id is required")?;
    let name = args.get_one::<String>("name").context("--name is required")?;
    let db = open_database(db_path)?;
    let site = pagekey_core::SiteRegistry::new(db).rename(id, name)?;
    println!(
        "{} Site #{} renamed to {}",
        "✓".green().bold(),
        site.id,
        site.name.bright_white()
    );
    Ok(())
}

pub fn handle_site_delete(args: &ArgMatches, db_path: &Path) -> anyhow::Result<()> {
    let id = *args.get_one::<i64>("id").context("--id is required")?;
    let db = open_database(db_path)?;
    db.delete_site(id)?;
    println!("{} Site #{} deleted", "✓".green().bold(), id);
    Ok(())
}

pub fn handle_credential_list(db_path: &Path) -> anyhow::Result<()> {
    let db = open_database(db_path)?;
    let credentials = db.all_credentials()?;

    print_header("CREDENTIALS");
    if credentials.is_empty() {
        println!("{} No credentials stored", "⚠".yellow());
    }
    for credential in &credentials {
        println!(
            "  {} {:<5} {:<28} {:<24} {}",
            "•".cyan(),
            format!("#{}", credential.id).bright_white(),
            credential.domain.bright_white().bold(),
            credential.username,
            mask_password(&credential.password).dimmed()
        );
        println!(
            "        last used {}",
            format_timestamp(credential.last_used)
        );
    }
    println!();
    print_divider();
    Ok(())
}

pub fn handle_credential_delete(args: &ArgMatches, db_path: &Path) -> anyhow::Result<()> {
    let id = *args.get_one::<i64>("id").context("--id is required")?;
    let db = open_database(db_path)?;
    db.delete_credential(id)?;
    println!("{} Credential #{} deleted", "✓".green().bold(), id);
    Ok(())
}
