use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use client_core::{
    load_settings,
    models::{CoverageRange, Package},
    validation::{PackageFormValues, TitleFormValues},
    ClientError, EholdingsClient, QueryScope, RequestKey, SearchParams, SelectedFilter,
    SelectionChange, SortOrder,
};
use serde_json::Value;
use shared::domain::{EntityKey, EntityType};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "eholdings", about = "Browse and curate eholdings records")]
struct Cli {
    /// Overrides the configured backend url.
    #[arg(long)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Show {
        kind: EntityType,
        id: String,
    },
    Search {
        kind: EntityType,
        query: Option<String>,
        /// Searches inside a parent record, e.g. `providers/19`.
        #[arg(long, value_parser = parse_parent)]
        within: Option<EntityKey>,
        #[arg(long)]
        selected: Option<bool>,
        #[arg(long = "type")]
        content_type: Option<String>,
        #[arg(long)]
        sort_by_name: bool,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Select {
        kind: EntityType,
        id: String,
    },
    Deselect {
        kind: EntityType,
        id: String,
        /// Confirms the deselection; without it the change is cancelled.
        #[arg(long)]
        yes: bool,
    },
    Coverage {
        package_id: String,
        #[arg(long)]
        begin: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    CreateTitle {
        name: String,
        #[arg(long)]
        package: String,
        #[arg(long, default_value = "")]
        publisher: String,
        #[arg(long, default_value = "Book")]
        publication_type: String,
    },
}

fn parse_parent(raw: &str) -> Result<EntityKey, String> {
    let (kind, id) = raw
        .split_once('/')
        .ok_or_else(|| format!("expected <kind>/<id>, got '{raw}'"))?;
    let kind = kind.parse::<EntityType>().map_err(|err| err.to_string())?;
    if id.trim().is_empty() {
        return Err(format!("missing id in '{raw}'"));
    }
    Ok(EntityKey::new(kind, id.trim()))
}

fn search_params(
    query: Option<String>,
    selected: Option<bool>,
    content_type: Option<String>,
    sort_by_name: bool,
) -> SearchParams {
    SearchParams {
        q: query,
        selected: match selected {
            Some(true) => SelectedFilter::Selected,
            Some(false) => SelectedFilter::NotSelected,
            None => SelectedFilter::All,
        },
        content_type,
        sort: if sort_by_name {
            SortOrder::Name
        } else {
            SortOrder::Relevance
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    let client = EholdingsClient::new(&settings).context("failed to build eholdings client")?;

    match cli.command {
        Command::Show { kind, id } => {
            let key = EntityKey::new(kind, id);
            let entity = client.find(&key).await.map_err(report)?;
            println!("{key}");
            println!(
                "{}",
                serde_json::to_string_pretty(&Value::Object(entity.attributes))?
            );
        }
        Command::Search {
            kind,
            query,
            within,
            selected,
            content_type,
            sort_by_name,
            page,
        } => {
            let scope = match within {
                Some(parent) => QueryScope::Related { parent, kind },
                None => QueryScope::Root(kind),
            };
            let params = search_params(query, selected, content_type, sort_by_name);
            let keys = client
                .query_page(&scope, &params, page)
                .await
                .map_err(report)?;
            let Some(collection) = client.collection(&scope, &params).await else {
                bail!("collection for {} was not recorded", scope.path());
            };
            if collection.is_empty() {
                println!("{}", collection.not_found_message());
                return Ok(());
            }
            println!("{}", collection.record_count_label());
            for key in keys {
                let Some(entity) = client.entity(&key).await else {
                    continue;
                };
                let name = entity.attr_str("name").unwrap_or("(unnamed)");
                let marker = if entity.is_selected() { "*" } else { " " };
                println!("{marker} {:<24} {name}", key.id);
            }
        }
        Command::Select { kind, id } => {
            let key = EntityKey::new(kind, id);
            let entity = client.find(&key).await.map_err(report)?;
            if entity.is_selected() {
                println!("{key} is already selected");
                return Ok(());
            }
            match client.toggle_selection(&key).await {
                Ok(SelectionChange::Saved(entity)) => {
                    info!(%key, "selected");
                    println!("{key} selected");
                    print_package_counts(&entity);
                }
                Ok(SelectionChange::AwaitingConfirmation) => {
                    warn!(%key, "selection flipped to a deselection, cancelling");
                    client.cancel_deselection(&key).await?;
                    bail!("{key} changed while selecting, nothing was saved");
                }
                Err(err) => return Err(report_request(&client, &key, err).await),
            }
        }
        Command::Deselect { kind, id, yes } => {
            let key = EntityKey::new(kind, id);
            let entity = client.find(&key).await.map_err(report)?;
            if !entity.is_selected() {
                println!("{key} is not selected");
                return Ok(());
            }
            if let SelectionChange::Saved(_) = client.toggle_selection(&key).await? {
                bail!("{key} was selected instead of deselected");
            }
            if !yes {
                info!(%key, "deselection not confirmed");
                client.cancel_deselection(&key).await?;
                println!("deselection of {key} cancelled, pass --yes to confirm");
                return Ok(());
            }
            match client.confirm_deselection(&key).await {
                Ok(entity) => {
                    info!(%key, "deselected");
                    println!("{key} deselected");
                    print_package_counts(&entity);
                }
                Err(err) => return Err(report_request(&client, &key, err).await),
            }
        }
        Command::Coverage {
            package_id,
            begin,
            end,
        } => {
            let key = EntityKey::new(EntityType::Packages, package_id);
            client.find(&key).await.map_err(report)?;
            let range = CoverageRange::new(begin, end);
            let values = PackageFormValues {
                custom_coverages: if range.is_empty() {
                    Vec::new()
                } else {
                    vec![range]
                },
            };
            match client.update_package_coverage(&key, &values).await {
                Ok(entity) => {
                    let package: Package = entity.project()?;
                    let coverage = package.custom_coverage;
                    info!(%key, cleared = coverage.is_empty(), "custom coverage saved");
                    if coverage.is_empty() {
                        println!("{key} has no custom coverage");
                    } else {
                        println!(
                            "{key} coverage: {} - {}",
                            date_label(coverage.begin_coverage),
                            date_label(coverage.end_coverage),
                        );
                    }
                }
                Err(err) => return Err(report_request(&client, &key, err).await),
            }
        }
        Command::CreateTitle {
            name,
            package,
            publisher,
            publication_type,
        } => {
            let values = TitleFormValues {
                name,
                publisher_name: publisher,
                publication_type,
                package_id: Some(package),
                ..TitleFormValues::default()
            };
            match client.create_title(&values).await {
                Ok(title) => {
                    info!(key = %title.key, "custom title created");
                    println!("created {}", title.key);
                }
                Err(err) => {
                    warn!(error = %err, "title creation failed");
                    let toaster = client.toaster(&RequestKey::create(EntityType::Titles)).await;
                    for toast in toaster.toasts {
                        eprintln!("error: {}", toast.message);
                    }
                    return Err(report(err));
                }
            }
        }
    }

    Ok(())
}

fn date_label(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "present".to_string(), |date| date.to_string())
}

fn print_package_counts(entity: &client_core::Entity) {
    if entity.key.kind != EntityType::Packages {
        return;
    }
    if let Ok(package) = entity.project::<Package>() {
        println!("{}", package.title_count_label());
    }
}

/// Prints the error toasts of the failed save before bailing out.
async fn report_request(
    client: &EholdingsClient,
    key: &EntityKey,
    err: ClientError,
) -> anyhow::Error {
    warn!(%key, error = %err, "save failed");
    let toaster = client.toaster(&RequestKey::update(key.clone())).await;
    for toast in toaster.toasts {
        eprintln!("error: {}", toast.message);
    }
    report(err)
}

fn report(err: ClientError) -> anyhow::Error {
    if let ClientError::Validation(fields) = &err {
        for (field, message) in fields.iter() {
            eprintln!("{field}: {message}");
        }
    }
    anyhow::Error::new(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_keys_accept_path_aliases() {
        assert_eq!(
            parse_parent("providers/19"),
            Ok(EntityKey::new(EntityType::Providers, "19"))
        );
        assert_eq!(
            parse_parent("resources/19-1-1001"),
            Ok(EntityKey::new(EntityType::CustomerResources, "19-1-1001"))
        );
        assert!(parse_parent("providers").is_err());
        assert!(parse_parent("providers/ ").is_err());
        assert!(parse_parent("widgets/1").is_err());
    }

    #[test]
    fn search_flags_map_to_params() {
        let cli = Cli::try_parse_from([
            "eholdings",
            "search",
            "packages",
            "other ordinary",
            "--within",
            "providers/19",
            "--selected",
            "true",
            "--type",
            "ebook",
            "--sort-by-name",
        ])
        .expect("cli");
        let Command::Search {
            kind,
            query,
            within,
            selected,
            content_type,
            sort_by_name,
            page,
        } = cli.command
        else {
            panic!("expected search");
        };
        assert_eq!(kind, EntityType::Packages);
        assert_eq!(within, Some(EntityKey::new(EntityType::Providers, "19")));
        assert_eq!(page, 1);

        let params = search_params(query, selected, content_type, sort_by_name);
        assert_eq!(params.filter_count(), 3);
        assert_eq!(
            params.to_query_string(1, 25),
            "q=other+ordinary&filter%5Bselected%5D=true&filter%5Btype%5D=ebook&sort=name&page=1&count=25"
        );
    }

    #[test]
    fn coverage_dates_parse_from_iso() {
        let cli = Cli::try_parse_from([
            "eholdings",
            "coverage",
            "19-1",
            "--begin",
            "2001-01-01",
        ])
        .expect("cli");
        let Command::Coverage { begin, end, .. } = cli.command else {
            panic!("expected coverage");
        };
        assert_eq!(begin, NaiveDate::from_ymd_opt(2001, 1, 1));
        assert_eq!(end, None);
    }
}
