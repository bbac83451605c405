use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::json;

use mfe_shell::auth::{AuthSyncEngine, Identity};
use mfe_shell::bus::EventBus;
use mfe_shell::config::ShellConfig;
use mfe_shell::host::{ModuleHost, Navigation};
use mfe_shell::locale::{Locale, LocaleSettings, LocaleSyncEngine, Translations};
use mfe_shell::logging;
use mfe_shell::registry::{
    ManifestLoaderFactory, ModuleContext, RemoteModuleResolver, ResolutionInputs,
};
use mfe_shell::routing::RouteResolver;
use mfe_shell::store::StoreRegistry;
use mfe_shell::theme::{builtin_theme, RenderTheme, ThemeRecords, ThemeSyncEngine};

#[derive(Parser)]
#[command(
    name = "mfe-shell",
    version,
    about = "Micro-frontend shell: module registry, routing and shared preferences"
)]
struct Cli {
    /// Config file path (default: platform config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered modules and where their code resolves to.
    Modules,

    /// Show the resolution mode and any missing remote settings.
    Mode,

    /// Show which module serves a path.
    Route { path: String },

    /// Show or change the persisted locale.
    Locale { code: Option<String> },

    /// Show or change the selected theme.
    Theme { id: Option<String> },

    /// Show, set or clear the signed-in identity.
    Auth {
        #[command(subcommand)]
        action: Option<AuthAction>,
    },

    /// Navigate through paths in order, mounting each module.
    Open {
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    Login {
        user_id: String,
        display_name: String,
        #[arg(long = "role")]
        roles: Vec<String>,
    },
    Logout,
}

fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ShellConfig::load_from(path),
        None => ShellConfig::load(),
    }
    .context("Failed to load configuration")?;

    match cli.command {
        Command::Modules => run_modules(&config),
        Command::Mode => {
            run_mode(&config);
            Ok(())
        }
        Command::Route { path } => {
            run_route(&config, &path);
            Ok(())
        }
        Command::Locale { code } => run_locale(&config, code.as_deref()),
        Command::Theme { id } => run_theme(&config, id.as_deref()),
        Command::Auth { action } => run_auth(&config, action),
        Command::Open { paths } => run_open(&config, &paths),
    }
}

fn run_modules(config: &ShellConfig) -> anyhow::Result<()> {
    let resolver = RemoteModuleResolver::from_env(&config.modules);
    let host = ModuleHost::from_config(
        config,
        &resolver,
        &ManifestLoaderFactory,
        ModuleContext::new(EventBus::new(), config.open_storage(), StoreRegistry::default()),
    )?;

    println!("Resolution mode: {}", resolver.mode());
    for module in host.registry().iter() {
        println!(
            "  {:<12} {:<24} :{:<5} {}",
            module.name, module.display_name, module.dev_port, module.source
        );
    }
    Ok(())
}

fn run_mode(config: &ShellConfig) {
    let inputs = ResolutionInputs::from_env(&config.modules);
    let resolver = RemoteModuleResolver::new(&config.modules, &inputs);

    println!("{}", resolver.mode());
    if inputs.development {
        println!("  development mode is on");
        return;
    }
    for env_var in inputs.missing() {
        println!("  missing {}", env_var);
    }
}

fn run_route(config: &ShellConfig, path: &str) {
    let routes = RouteResolver::new(config.route_mappings());
    match routes.resolve(path) {
        Some(module) => println!("{} -> {}", path, module),
        None => println!("{} -> (no route)", path),
    }
}

fn translations() -> Translations {
    Translations::new()
        .with_table(
            Locale::En,
            json!({"shell": {"language": "Language: {{name}}"}}),
        )
        .with_table(Locale::Es, json!({"shell": {"language": "Idioma: {{name}}"}}))
        .with_table(Locale::Fr, json!({"shell": {"language": "Langue : {{name}}"}}))
        .with_table(Locale::De, json!({"shell": {"language": "Sprache: {{name}}"}}))
}

fn run_locale(config: &ShellConfig, code: Option<&str>) -> anyhow::Result<()> {
    let bus = EventBus::new();
    let storage = config.open_storage();
    let engine = LocaleSyncEngine::new(
        &bus,
        &storage,
        LocaleSettings {
            default: config.default_locale(),
            fallback: config.fallback_locale(),
        },
        Arc::new(translations()),
    );

    if let Some(code) = code {
        engine.set_locale_code(code)?;
    }
    println!(
        "{}",
        engine.t_with("shell.language", &[("name", engine.locale().code())])
    );
    Ok(())
}

fn run_theme(config: &ShellConfig, id: Option<&str>) -> anyhow::Result<()> {
    let bus = EventBus::new();
    let storage = config.open_storage();
    let engine = ThemeSyncEngine::mount(
        &bus,
        &storage,
        RenderTheme::default(),
        Arc::new(RenderTheme::from_config),
    );

    if let Some(id) = id {
        let records = ThemeRecords::new(storage.clone(), bus.clone());
        let theme_config = match records.find(id) {
            Some(record) => record.theme_config,
            None => match builtin_theme(id) {
                Some(descriptor) => descriptor,
                None => bail!("Unknown theme '{}'", id),
            },
        };
        records.select(id, theme_config);
    }

    let theme = engine.current();
    println!("origin: {:?}", engine.origin());
    println!("mode:   {:?}", theme.mode);
    if let Some(primary) = theme.primary {
        println!("primary: {}", primary);
    }
    Ok(())
}

fn run_auth(config: &ShellConfig, action: Option<AuthAction>) -> anyhow::Result<()> {
    let engine = AuthSyncEngine::new(&EventBus::new(), &config.open_storage());

    match action {
        Some(AuthAction::Login {
            user_id,
            display_name,
            roles,
        }) => {
            let mut identity = Identity::new(user_id, display_name);
            identity.roles = roles;
            engine.login(identity)?;
        }
        Some(AuthAction::Logout) => engine.logout(),
        None => {}
    }

    match engine.identity() {
        Some(identity) if identity.roles.is_empty() => {
            println!("{} ({})", identity.display_name, identity.user_id)
        }
        Some(identity) => println!(
            "{} ({}) [{}]",
            identity.display_name,
            identity.user_id,
            identity.roles.join(", ")
        ),
        None => println!("signed out"),
    }
    Ok(())
}

fn run_open(config: &ShellConfig, paths: &[String]) -> anyhow::Result<()> {
    let resolver = RemoteModuleResolver::from_env(&config.modules);
    let ctx = ModuleContext::new(EventBus::new(), config.open_storage(), StoreRegistry::default());
    let host = ModuleHost::from_config(config, &resolver, &ManifestLoaderFactory, ctx)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(async {
        for path in paths {
            match host.navigate(path).await? {
                Navigation::Mounted {
                    module,
                    first_activation,
                    view,
                } => {
                    let marker = if first_activation { "new" } else { "kept" };
                    println!("{} -> {} ({})", path, module, marker);
                    println!("  {}: {}", view.title, view.body);
                }
                Navigation::NotFound { path } => println!("{} -> (no route)", path),
                Navigation::Superseded { module } => println!("{} -> {} (superseded)", path, module),
            }
        }
        anyhow::Ok(())
    })?;

    let mounted = host.mounted();
    let names: Vec<&str> = mounted.iter().collect();
    println!("mounted: {}", names.join(", "));
    Ok(())
}
