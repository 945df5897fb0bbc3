// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use runtime::ApiRuntime;
use shopfront_api::{Client, ProductPageSource};
use shopfront_app::{
    AppCommand, AppState, CategoryId, FilterForm, ListController, PageSource, Product,
    QueryCache, SortState, drive, format_price,
};
use shopfront_store::Store;
use shopfront_tui::LaunchOptions;
use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SHOPFRONT_LOG";

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `shopfront --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;
    init_logging(&config)?;

    let db_path = config.db_path()?;
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let mut store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or SHOPFRONT_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;

    let client = Client::new(
        config.api_base_url(),
        config.api_token(),
        config.api_timeout()?,
    )
    .with_context(|| {
        format!(
            "invalid [api] config in {}; fix base_url/token/timeout values",
            options.config_path.display()
        )
    })?;
    if options.check_only {
        return Ok(());
    }

    let sort = match options.sort {
        Some(sort) => sort,
        None => store.get_sort()?.unwrap_or_else(|| config.default_sort()),
    };
    let source = ProductPageSource::new(client);
    info!(base_url = config.api_base_url(), sort = %sort.as_wire(), "starting shopfront");

    if let Some(max_pages) = options.dump_pages {
        let filters = if options.provider {
            FilterForm::provider_products(sort)
        } else {
            let category_id = match options.category {
                Some(category_id) => category_id,
                None => first_category(source.client())?,
            };
            FilterForm::category_products(category_id, sort)
        };
        let stdout = io::stdout();
        let mut out = stdout.lock();
        dump_listing(&source, filters, max_pages, &mut out)?;
        return Ok(());
    }

    let mut state = AppState {
        view_type: store
            .get_view_type()?
            .unwrap_or_else(|| config.view_type()),
        ..AppState::default()
    };
    if options.provider {
        state.dispatch(AppCommand::NextListing);
    }

    let mut runtime = ApiRuntime::new(source, &mut store);
    shopfront_tui::run_app(
        &mut state,
        &mut runtime,
        LaunchOptions {
            category: options.category,
            sort,
        },
    )
}

fn first_category(client: &Client) -> Result<CategoryId> {
    let categories = client.get_categories()?;
    categories
        .first()
        .map(|category| category.id)
        .ok_or_else(|| anyhow!("the shop has no categories -- pass --category <id> or --provider"))
}

/// Loads up to `max_pages` pages headlessly and writes one line per product.
/// Returns the number of products written.
fn dump_listing<S, W>(source: &S, filters: FilterForm, max_pages: u32, out: &mut W) -> Result<usize>
where
    S: PageSource<Product> + ?Sized,
    W: Write,
{
    let mut cache = QueryCache::new();
    let (mut controller, effects) = ListController::initialize(filters);
    drive(&mut controller, source, &mut cache, effects);

    let mut loaded = 1;
    while loaded < max_pages {
        let effects = controller.on_visibility_trigger();
        if effects.is_empty() {
            break;
        }
        drive(&mut controller, source, &mut cache, effects);
        loaded += 1;
    }

    if let Some(error) = controller.last_error() {
        bail!("load {}: {error}", controller.query_key());
    }

    writeln!(
        out,
        "# {} · {} products · {} page(s) loaded",
        controller.title().unwrap_or("products"),
        controller.total_results(),
        controller.pages().len()
    )?;
    let mut written = 0;
    for product in controller.all_items() {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            product.id,
            product.name,
            format_price(product.price),
            product.stock
        )?;
        written += 1;
    }
    if controller.has_next_page() {
        writeln!(out, "# more pages available -- raise --dump to load them")?;
    }
    Ok(written)
}

/// `SHOPFRONT_LOG` wins over `[log].level`; blank values count as unset.
fn log_directive(env_value: Option<String>, config_level: Option<&str>) -> Option<String> {
    env_value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .or_else(|| config_level.map(str::to_owned))
}

fn init_logging(config: &Config) -> Result<()> {
    let Some(directive) = log_directive(env::var(LOG_ENV).ok(), config.log_level()) else {
        return Ok(());
    };
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter {directive:?} in {LOG_ENV} or [log].level"))?;

    let path = log_file_path()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;
    Ok(())
}

fn log_file_path() -> Result<PathBuf> {
    let data_root = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("cannot resolve data directory for the log file"))?;
    let app_dir = data_root.join(shopfront_store::APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("shopfront.log"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    category: Option<CategoryId>,
    provider: bool,
    sort: Option<SortState>,
    dump_pages: Option<u32>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        category: None,
        provider: false,
        sort: None,
        dump_pages: None,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--category" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--category requires a category id"))?;
                let id: i64 = value.as_ref().parse().with_context(|| {
                    format!("--category expects a numeric id, got {:?}", value.as_ref())
                })?;
                if id <= 0 {
                    bail!("--category expects a positive id, got {id}");
                }
                options.category = Some(CategoryId::new(id));
            }
            "--provider" => {
                options.provider = true;
            }
            "--sort" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--sort requires a sort order"))?;
                let sort = SortState::parse(value.as_ref()).ok_or_else(|| {
                    anyhow!(
                        "unknown sort {:?} -- use e.g. \"createdAt desc\", \"price asc\" or \"name\"",
                        value.as_ref()
                    )
                })?;
                options.sort = Some(sort);
            }
            "--dump" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--dump requires a page count"))?;
                let pages: u32 = value.as_ref().parse().with_context(|| {
                    format!("--dump expects a page count, got {:?}", value.as_ref())
                })?;
                if pages == 0 {
                    bail!("--dump needs at least 1 page");
                }
                options.dump_pages = Some(pages);
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
        }
    }

    if options.provider && options.category.is_some() {
        bail!("--provider and --category are mutually exclusive");
    }

    Ok(options)
}

fn print_help() {
    println!("shopfront");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config + DB + API settings");
    println!("  --category <id>          Open this category's listing");
    println!("  --provider               Open the provider's own products");
    println!("  --sort <order>           Listing sort, e.g. \"price asc\"");
    println!("  --dump <pages>           Print up to <pages> pages instead of starting the UI");
    println!("  --help                   Show this help");
}
