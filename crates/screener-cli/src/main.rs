//! Command-line interface for screener-rs

mod output;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use screener_prompt::{
    DEFAULT_CONDITION_TEMPLATE, ScreeningCriteria, TargetDate, Variables, check_syntax,
    missing_variables, render_template, rerender_preserving_edits,
};
use screener_store::{CollectionStore, DATE_WARNING, FileStorage, NewTemplate, Outcome, Template};
use screener_utils::{Config, LogFormat};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "screener")]
#[command(author, version, about = "Screening condition generator with a template library", long_about = None)]
struct Cli {
    /// Directory holding the template library (overrides SCREENER_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log format: text or json (overrides SCREENER_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct DateArgs {
    /// Target date as YYYY-MM-DD or YYYY年M月D日 (default: today)
    #[arg(long, conflicts_with_all = ["yesterday", "tomorrow"])]
    date: Option<TargetDate>,

    /// Use yesterday as the target date
    #[arg(long, conflicts_with = "tomorrow")]
    yesterday: bool,

    /// Use tomorrow as the target date
    #[arg(long)]
    tomorrow: bool,
}

impl DateArgs {
    fn resolve(&self) -> TargetDate {
        match (self.date, self.yesterday, self.tomorrow) {
            (Some(date), _, _) => date,
            (None, true, _) => TargetDate::yesterday(),
            (None, _, true) => TargetDate::tomorrow(),
            _ => TargetDate::today(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the preset catalog
    Presets,
    /// List templates
    List {
        /// Only custom templates
        #[arg(long, group = "filter")]
        custom: bool,
        /// Recently used templates
        #[arg(long, group = "filter")]
        recent: bool,
        /// Templates in the main favorites
        #[arg(long, group = "filter")]
        favorites: bool,
        /// Templates carrying this tag
        #[arg(long, group = "filter")]
        tag: Option<String>,
        /// Templates in this favorite list
        #[arg(long, group = "filter")]
        list: Option<String>,
    },
    /// Show named favorite lists
    Lists,
    /// Show every tag in use
    Tags,
    /// Print a template for a target date (its saved edit if one exists)
    Render {
        id: String,
        #[command(flatten)]
        date: DateArgs,
        /// Extra placeholder value as key=value
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
        /// Ignore any saved edit and print the generated text
        #[arg(long)]
        generated: bool,
    },
    /// Build the default condition from structured criteria
    Build {
        #[command(flatten)]
        date: DateArgs,
        /// JSON file with criteria overrides
        #[arg(long)]
        criteria: Option<PathBuf>,
    },
    /// Save a new custom template
    New {
        #[arg(long)]
        name: String,
        /// Template body (`{key}` placeholders and/or literal dates)
        #[arg(long, required_unless_present = "body_file")]
        body: Option<String>,
        /// Read the body from a file
        #[arg(long, conflicts_with = "body")]
        body_file: Option<PathBuf>,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Delete a custom template and every reference to it
    Delete { id: String },
    /// Add a template to the main favorites
    Favorite {
        id: String,
        /// Remove instead of add
        #[arg(long)]
        off: bool,
    },
    /// Remove a template from the main favorites and every list
    UnfavoriteAll { id: String },
    /// Create a named favorite list
    ListCreate { name: String },
    /// Delete a named favorite list
    ListDelete { list_id: String },
    /// Add a template to a named list
    ListAdd { template_id: String, list_id: String },
    /// Remove a template from a named list
    ListRemove { template_id: String, list_id: String },
    /// Tag a template
    TagAdd { id: String, tag: String },
    /// Remove a tag from a template
    TagRemove { id: String, tag: String },
    /// Lock in an edited text for a template
    EditSave {
        id: String,
        /// Edited text (read from stdin when omitted)
        text: Option<String>,
    },
    /// Drop a template's saved edit
    EditClear { id: String },
    /// Run the heuristic syntax check on a template's current text
    Check {
        id: String,
        #[command(flatten)]
        date: DateArgs,
    },
    /// Write a template's current text to a file
    Export {
        id: String,
        #[command(flatten)]
        date: DateArgs,
        /// Output path (default: 股票筛选-YYYY-MM-DD.txt)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env().context("Invalid SCREENER_* environment")?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir.clone_from(dir);
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    match cli.verbose {
        0 => {}
        1 => config.log_level = "info".to_string(),
        2 => config.log_level = "debug".to_string(),
        _ => config.log_level = "trace".to_string(),
    }
    config.validate()?;
    Ok(config)
}

fn find<'a>(store: &'a CollectionStore<FileStorage>, id: &str) -> Result<&'a Template> {
    store
        .find_template(id)
        .with_context(|| format!("未找到模板: {id}"))
}

/// The text a user would see for `id` on `date`: saved edit re-dated, or generated
fn current_text(
    store: &CollectionStore<FileStorage>,
    id: &str,
    date: TargetDate,
    vars: &Variables,
    generated_only: bool,
) -> Result<String> {
    let template = find(store, id)?;
    if !generated_only {
        if let Some(fork) = store.saved_edit(id) {
            let rerendered = rerender_preserving_edits(fork, date);
            if !rerendered.date_found {
                eprintln!("{DATE_WARNING}");
            }
            return Ok(rerendered.text);
        }
    }

    let missing = missing_variables(&template.body, vars);
    if !missing.is_empty() {
        debug!("Unresolved placeholders render empty: {:?}", missing);
    }
    Ok(render_template(&template.body, vars))
}

fn run(cli: Cli, config: &Config) -> Result<()> {
    let mut store = CollectionStore::open(FileStorage::new(&config.data_dir));

    match cli.command {
        Commands::Presets => {
            println!("{}", output::presets_table());
        }
        Commands::List {
            custom,
            recent,
            favorites,
            tag,
            list,
        } => {
            let templates: Vec<&Template> = if custom {
                store.custom_templates().iter().collect()
            } else if recent {
                store.recent_templates()
            } else if favorites {
                store.favorite_templates()
            } else if let Some(tag) = tag {
                store.templates_by_tag(&tag)
            } else if let Some(list_id) = list {
                if store.find_list(&list_id).is_none() {
                    bail!("未找到收藏夹: {list_id}");
                }
                store.templates_in_list(&list_id)
            } else {
                store.all_templates().collect()
            };
            println!("{}", output::templates_table(&store, &templates));
        }
        Commands::Lists => {
            println!("{}", output::lists_table(store.favorite_lists()));
        }
        Commands::Tags => {
            println!("{}", output::tags_table(&store));
        }
        Commands::Render {
            id,
            date,
            vars,
            generated,
        } => {
            let date = date.resolve();
            let mut variables = Variables::with_target_date(date);
            for assignment in &vars {
                variables.insert_assignment(assignment)?;
            }
            let text = current_text(&store, &id, date, &variables, generated)?;
            store.add_to_recent(&id)?;
            println!("{text}");
        }
        Commands::Build { date, criteria } => {
            let criteria: ScreeningCriteria = match criteria {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_str(&raw)
                        .with_context(|| format!("Invalid criteria in {}", path.display()))?
                }
                None => ScreeningCriteria::default(),
            };
            let variables = criteria.variables(date.resolve())?;
            println!("{}", render_template(DEFAULT_CONDITION_TEMPLATE, &variables));
        }
        Commands::New {
            name,
            body,
            body_file,
            description,
            tags,
        } => {
            let body = match (body, body_file) {
                (Some(body), _) => body,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => bail!("--body or --body-file is required"),
            };
            let mut new = NewTemplate::new(name, body).description(description);
            for tag in tags {
                new = new.tag(tag);
            }
            let outcome = store.create_template(new)?;
            match &outcome {
                Outcome::Applied(t) => {
                    println!("✅ 已保存自定义模板: {} ({})", t.name, t.id);
                }
                other => println!("{}", output::outcome_message(other, "")),
            }
        }
        Commands::Delete { id } => {
            let outcome = store.delete_template(&id)?;
            println!("{}", output::outcome_message(&outcome, "已删除模板"));
        }
        Commands::Favorite { id, off } => {
            find(&store, &id)?;
            let outcome = store.set_favorite(&id, !off)?;
            let message = if off { "已取消收藏" } else { "已收藏" };
            println!("{}", output::outcome_message(&outcome, message));
        }
        Commands::UnfavoriteAll { id } => {
            let outcome = store.unfavorite_everywhere(&id)?;
            println!("{}", output::outcome_message(&outcome, "已从所有收藏中移除"));
        }
        Commands::ListCreate { name } => {
            let outcome = store.create_favorite_list(&name)?;
            match &outcome {
                Outcome::Applied(list) => {
                    println!("✅ 已创建收藏夹: {} ({})", list.name, list.id);
                }
                Outcome::Unchanged => println!("ℹ️ 收藏夹已存在: {}", name.trim()),
                other => println!("{}", output::outcome_message(other, "")),
            }
        }
        Commands::ListDelete { list_id } => {
            let outcome = store.delete_favorite_list(&list_id)?;
            println!("{}", output::outcome_message(&outcome, "已删除收藏夹"));
        }
        Commands::ListAdd {
            template_id,
            list_id,
        } => {
            find(&store, &template_id)?;
            let outcome = store.add_template_to_list(&template_id, &list_id)?;
            println!("{}", output::outcome_message(&outcome, "已加入收藏夹"));
        }
        Commands::ListRemove {
            template_id,
            list_id,
        } => {
            let outcome = store.remove_template_from_list(&template_id, &list_id)?;
            println!("{}", output::outcome_message(&outcome, "已移出收藏夹"));
        }
        Commands::TagAdd { id, tag } => {
            find(&store, &id)?;
            let outcome = store.add_tag(&id, &tag)?;
            println!("{}", output::outcome_message(&outcome, "已添加标签"));
        }
        Commands::TagRemove { id, tag } => {
            let outcome = store.remove_tag(&id, &tag)?;
            println!("{}", output::outcome_message(&outcome, "已移除标签"));
        }
        Commands::EditSave { id, text } => {
            find(&store, &id)?;
            let text = match text {
                Some(text) => text,
                None => std::io::read_to_string(std::io::stdin())
                    .context("Failed to read edited text from stdin")?,
            };
            let outcome = store.save_edit(&id, &text)?;
            println!("{}", output::outcome_message(&outcome, "已保存编辑"));
        }
        Commands::EditClear { id } => {
            let outcome = store.clear_edit(&id)?;
            println!("{}", output::outcome_message(&outcome, "已恢复默认"));
        }
        Commands::Check { id, date } => {
            let date = date.resolve();
            let text = current_text(&store, &id, date, &Variables::with_target_date(date), false)?;
            println!("{}", check_syntax(&text));
        }
        Commands::Export { id, date, out } => {
            let date = date.resolve();
            let text = current_text(&store, &id, date, &Variables::with_target_date(date), false)?;
            let path = out.unwrap_or_else(|| {
                PathBuf::from(format!("股票筛选-{}.txt", TargetDate::today().iso()))
            });
            std::fs::write(&path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✅ 已导出到 {}", path.display());
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    screener_utils::init_tracing(&config.log_level, config.log_format);

    info!(
        "Starting {} with data dir {}",
        config.app_name,
        config.data_dir.display()
    );

    run(cli, &config)
}
