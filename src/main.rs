use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use interlink_cli::catalog::{Catalog, RuleQuery, RuleStore};
use interlink_cli::config::{
	CONFIG_FILE_NAME, MergedConfig, discover_configs, generate_init_template, load_config_file,
	load_merged_config, user_config_path,
};
use interlink_cli::rewrite::Rewriter;
use interlink_cli::rules::{Eligibility, PageContext, select_for_page};
use interlink_cli::tracking::{
	ClickEvent, ClickLog, STATS_WINDOW_DAYS, daily_counts, top_links, track_click,
	tracking_enabled,
};
use interlink_cli::transfer::{
	DEFAULT_SEPARATOR, ImportMode, ImportReport, export_csv, export_json, import_csv, import_json,
};

const DEFAULT_CATALOG: &str = "links.json";
const DEFAULT_CLICK_LOG: &str = "clicks.jsonl";

#[derive(Parser)]
#[command(name = "interlink")]
#[command(
	author,
	version,
	about = "CLI tool for turning keywords in rendered pages into internal links"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	/// Create a template .interlink.toml in the current directory
	#[arg(long)]
	init: bool,

	/// Overwrite existing .interlink.toml when using --init
	#[arg(long, requires = "init")]
	force: bool,

	/// Use this config file instead of discovering .interlink.toml files
	#[arg(long, global = true, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Log progress to stderr (overrides RUST_LOG)
	#[arg(short, long, global = true)]
	verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Insert links into an HTML document and print the result
	Rewrite(RewriteArgs),

	/// Import links from a CSV or JSON file into the catalog
	Import {
		/// File to import
		file: PathBuf,

		/// How rows are reconciled with existing links
		#[arg(long, default_value_t = ImportMode::Add)]
		mode: ImportMode,

		/// Input format; guessed from the file extension by default
		#[arg(long, value_enum)]
		format: Option<Format>,
	},

	/// Export the catalog as CSV or JSON
	Export {
		#[arg(long, value_enum, default_value_t = Format::Csv)]
		format: Format,

		/// CSV field separator
		#[arg(long, default_value_t = DEFAULT_SEPARATOR as char)]
		separator: char,

		/// Write to this file instead of stdout
		#[arg(long, short)]
		output: Option<PathBuf>,
	},

	/// Record a click on an inserted link
	Track {
		#[arg(long)]
		link_id: u64,

		#[arg(long, default_value = "")]
		title: String,

		/// Page the link was clicked on
		#[arg(long, default_value = "")]
		source: String,

		/// URL the link points to
		#[arg(long, default_value = "")]
		destination: String,

		/// The visitor is logged in
		#[arg(long)]
		logged_in: bool,
	},

	/// Show clicks per day and the most clicked links
	Stats {
		#[arg(long, default_value_t = STATS_WINDOW_DAYS)]
		days: u32,
	},

	/// Configuration management commands
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},
}

#[derive(clap::Args)]
struct RewriteArgs {
	/// HTML file to rewrite, or `-` for stdin
	input: PathBuf,

	/// Canonical URL of the page
	#[arg(long)]
	url: String,

	/// Permalink of the page, if different from its URL
	#[arg(long)]
	permalink: Option<String>,

	/// Path the page was requested under
	#[arg(long)]
	request_path: Option<String>,

	/// Id of the page, used to avoid linking it to itself
	#[arg(long)]
	page_id: Option<u64>,

	/// Host name the page is served under; taken from --url by default
	#[arg(long)]
	host: Option<String>,

	/// Content type of the page
	#[arg(long, default_value = "page")]
	post_type: String,
}

#[derive(Subcommand)]
enum ConfigAction {
	/// Display merged effective configuration with source annotations
	Show,
	/// Check all config files for errors without running anything
	Validate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
	Csv,
	Json,
}

fn main() -> ExitCode {
	match run() {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn run() -> Result<ExitCode> {
	let cli = Cli::parse();

	// --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
	let filter = if cli.verbose {
		EnvFilter::new("info")
	} else {
		EnvFilter::from_default_env()
	};
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();

	if cli.init {
		return handle_init(cli.force);
	}

	let Some(command) = cli.command else {
		return Ok(ExitCode::SUCCESS);
	};
	let config_file = cli.config.as_deref();

	match command {
		Commands::Rewrite(args) => handle_rewrite(config_file, &args),
		Commands::Import { file, mode, format } => handle_import(config_file, &file, mode, format),
		Commands::Export {
			format,
			separator,
			output,
		} => handle_export(config_file, format, separator, output.as_deref()),
		Commands::Track {
			link_id,
			title,
			source,
			destination,
			logged_in,
		} => handle_track(
			config_file,
			ClickEvent::new(link_id, title, source, destination),
			logged_in,
		),
		Commands::Stats { days } => handle_stats(config_file, days),
		Commands::Config { action } => match action {
			ConfigAction::Show => handle_config_show(config_file),
			ConfigAction::Validate => handle_config_validate(config_file),
		},
	}
}

fn load_config(config_file: Option<&Path>) -> Result<MergedConfig> {
	match config_file {
		Some(path) => load_config_file(path)
			.with_context(|| format!("Failed to load configuration from {}", path.display())),
		None => {
			let cwd = std::env::current_dir().context("Failed to get current directory")?;
			load_merged_config(&cwd).context("Failed to load configuration")
		}
	}
}

fn catalog_path(config: &MergedConfig) -> PathBuf {
	config
		.catalog
		.clone()
		.unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG))
}

fn click_log_path(config: &MergedConfig) -> PathBuf {
	config
		.click_log
		.clone()
		.unwrap_or_else(|| PathBuf::from(DEFAULT_CLICK_LOG))
}

fn load_catalog(path: &Path) -> Result<Catalog> {
	Catalog::load(path).with_context(|| format!("Failed to load catalog {}", path.display()))
}

fn handle_init(force: bool) -> Result<ExitCode> {
	let config_path = PathBuf::from(CONFIG_FILE_NAME);

	if config_path.exists() && !force {
		anyhow::bail!("{CONFIG_FILE_NAME} already exists. Use --force to overwrite.");
	}

	let template = generate_init_template();
	std::fs::write(&config_path, template)
		.with_context(|| format!("Failed to write {}", config_path.display()))?;

	println!("Created {CONFIG_FILE_NAME}");
	Ok(ExitCode::SUCCESS)
}

fn handle_rewrite(config_file: Option<&Path>, args: &RewriteArgs) -> Result<ExitCode> {
	let html = if args.input.as_os_str() == "-" {
		let mut html = String::new();
		std::io::stdin()
			.read_to_string(&mut html)
			.context("Failed to read HTML from stdin")?;
		html
	} else {
		std::fs::read_to_string(&args.input)
			.with_context(|| format!("Failed to read {}", args.input.display()))?
	};

	let config = load_config(config_file)?;
	let page = PageContext {
		canonical_url: Some(args.url.clone()),
		permalink: args.permalink.clone(),
		request_path: args.request_path.clone(),
		hostname: args.host.clone().unwrap_or_else(|| host_of(&args.url)),
		post_type: args.post_type.clone(),
		page_id: args.page_id,
	};

	let eligibility = Eligibility::compile(&config.settings);
	if !eligibility.should_rewrite(&page.candidate_urls(), &page.post_type) {
		print!("{html}");
		return Ok(ExitCode::SUCCESS);
	}

	let catalog = load_catalog(&catalog_path(&config))?;
	let rules = catalog.list(&RuleQuery::active());
	let selected = select_for_page(&rules, &page);

	let rewriter = Rewriter::new(&config.pages).with_exclusions(&config.settings.exclude);
	print!("{}", rewriter.rewrite(&html, selected));
	Ok(ExitCode::SUCCESS)
}

fn host_of(url: &str) -> String {
	url::Url::parse(url)
		.ok()
		.and_then(|url| url.host_str().map(str::to_string))
		.unwrap_or_default()
}

fn handle_import(
	config_file: Option<&Path>,
	file: &Path,
	mode: ImportMode,
	format: Option<Format>,
) -> Result<ExitCode> {
	let config = load_config(config_file)?;
	let path = catalog_path(&config);
	let mut catalog = load_catalog(&path)?;

	let data = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
	let format = format.unwrap_or_else(|| match file.extension() {
		Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
		_ => Format::Csv,
	});
	let report = match format {
		Format::Csv => import_csv(&data, mode, &mut catalog),
		Format::Json => import_json(&data, mode, &mut catalog),
	}
	.with_context(|| format!("Failed to import {}", file.display()))?;

	catalog
		.save(&path)
		.with_context(|| format!("Failed to save catalog {}", path.display()))?;

	print_report(&report);
	Ok(if report.failed() == 0 {
		ExitCode::SUCCESS
	} else {
		ExitCode::FAILURE
	})
}

fn print_report(report: &ImportReport) {
	println!(
		"Imported {} of {} rows: {} inserted, {} updated, {} skipped, {} failed",
		report.succeeded(),
		report.rows.len(),
		report.inserted(),
		report.updated(),
		report.skipped(),
		report.failed()
	);
	for (line, message) in report.errors() {
		eprintln!("  line {line}: {message}");
	}
}

fn handle_export(
	config_file: Option<&Path>,
	format: Format,
	separator: char,
	output: Option<&Path>,
) -> Result<ExitCode> {
	let config = load_config(config_file)?;
	let catalog = load_catalog(&catalog_path(&config))?;

	let content = match format {
		Format::Csv => {
			let separator = u8::try_from(separator)
				.ok()
				.filter(u8::is_ascii)
				.with_context(|| format!("Separator must be a single ASCII character: {separator}"))?;
			export_csv(catalog.rules(), separator)?
		}
		Format::Json => export_json(catalog.rules())?,
	};

	match output {
		Some(path) => {
			std::fs::write(path, &content)
				.with_context(|| format!("Failed to write {}", path.display()))?;
			println!("Exported {} links to {}", catalog.len(), path.display());
		}
		None => print!("{content}"),
	}
	Ok(ExitCode::SUCCESS)
}

fn handle_track(
	config_file: Option<&Path>,
	event: ClickEvent,
	logged_in: bool,
) -> Result<ExitCode> {
	let config = load_config(config_file)?;

	if !tracking_enabled(&config.settings, logged_in) {
		println!("Click tracking is disabled.");
		return Ok(ExitCode::SUCCESS);
	}

	let log = ClickLog::new(click_log_path(&config));
	if track_click(&log, &event) {
		println!("Recorded click on link {}", event.link_id);
	} else {
		println!("Click not recorded.");
	}
	Ok(ExitCode::SUCCESS)
}

fn handle_stats(config_file: Option<&Path>, days: u32) -> Result<ExitCode> {
	let config = load_config(config_file)?;
	let log = ClickLog::new(click_log_path(&config));
	let events = log
		.load()
		.with_context(|| format!("Failed to read click log {}", log.path().display()))?;
	let catalog = load_catalog(&catalog_path(&config))?;

	let today = chrono::Utc::now().date_naive();
	println!("Clicks per day (last {days} days):");
	for day in daily_counts(&events, today, days) {
		println!("  {}  {}", day.date, day.clicks);
	}

	println!();
	println!("Most clicked links:");
	let ranked = top_links(&events, &catalog);
	if ranked.is_empty() {
		println!("  (none)");
	}
	for link in ranked {
		println!("  {} (#{}): {}", link.title, link.link_id, link.clicks);
	}
	Ok(ExitCode::SUCCESS)
}

fn handle_config_show(config_file: Option<&Path>) -> Result<ExitCode> {
	let config = load_config(config_file)?;

	if config.sources.is_empty() {
		println!("No configuration files found.");
		return Ok(ExitCode::SUCCESS);
	}

	println!("Configuration files (in cascade order):");
	for source in &config.sources {
		println!("  {}", source.display());
	}
	println!();

	println!("catalog: {}", catalog_path(&config).display());
	println!("click-log: {}", click_log_path(&config).display());
	println!();

	let settings = toml::to_string_pretty(&config.settings)
		.context("Failed to render effective settings")?;
	println!("[settings]");
	print!("{settings}");

	if !config.pages.is_empty() {
		println!();
		println!("[pages]");
		for (page_id, url) in &config.pages {
			println!("{page_id} = {url:?}");
		}
	}

	// Show user config path
	if let Ok(user_path) = user_config_path() {
		println!();
		println!("User config path: {}", user_path.display());
		if user_path.exists() {
			println!("  (exists)");
		} else {
			println!("  (not found)");
		}
	}

	Ok(ExitCode::SUCCESS)
}

fn handle_config_validate(config_file: Option<&Path>) -> Result<ExitCode> {
	let result = match config_file {
		Some(path) => load_config_file(path).map(|config| config.sources),
		None => {
			let cwd = std::env::current_dir().context("Failed to get current directory")?;
			discover_configs(&cwd).map(|configs| configs.into_iter().map(|c| c.path).collect())
		}
	};

	match result {
		Ok(sources) => {
			if sources.is_empty() {
				println!("No configuration files found.");
			} else {
				println!("All configuration files are valid:");
				for source in &sources {
					println!("  {}", source.display());
				}
			}
			Ok(ExitCode::SUCCESS)
		}
		Err(e) => {
			eprintln!("Configuration error: {}", e);
			Ok(ExitCode::FAILURE)
		}
	}
}
