use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, io};

use playground::kernel::services::adapters::{
    ensure_settings_file, load_settings, HttpCompletionClient, InMemoryPlaygroundStore,
    LocalSandboxProvider, SandboxRuntimeManager, SuggestionRunner,
};
use playground::kernel::services::ports::{NewProject, Settings, Template};
use playground::kernel::{PlaygroundSession, SessionServices};
use playground::models::{NodePath, VirtualFileTree};

mod logging;

fn main() -> io::Result<()> {
    let args: Vec<String> = env::args().collect();
    let Some(project_dir) = args.get(1).map(PathBuf::from) else {
        eprintln!("usage: playground <project-dir> [file]");
        std::process::exit(2);
    };
    let open_path = args.get(2).map(|p| NodePath::parse(p));

    let logging = logging::init();

    if let Err(err) = ensure_settings_file() {
        tracing::warn!(error = %err, "failed to create settings file");
    }
    let settings = load_settings().unwrap_or_default();

    let tree = VirtualFileTree::from_dir(&project_dir)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(&settings, &project_dir, tree, open_path));

    if let Some(guard) = &logging {
        println!("logs: {}", guard.log_dir().display());
    }
    result
}

async fn run(
    settings: &Settings,
    project_dir: &Path,
    tree: VirtualFileTree,
    open_path: Option<NodePath>,
) -> io::Result<()> {
    let store = Arc::new(InMemoryPlaygroundStore::new());
    let title = tree.root().name.clone();
    let meta = store.insert(NewProject {
        title,
        description: Some(project_dir.display().to_string()),
        template: Template::React,
        tree,
    });

    let provider = Arc::new(LocalSandboxProvider::new(settings.sandbox.work_dir_or_default()));
    let runtime = Arc::new(SandboxRuntimeManager::new(provider));
    let services = SessionServices {
        store,
        runtime: Arc::clone(&runtime),
        suggestions: SuggestionRunner::new(Arc::new(HttpCompletionClient::from_settings(
            &settings.completion,
        ))),
    };

    let mut session = PlaygroundSession::load(services, &meta.id)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e.to_string()))?;
    session.set_suggestions_enabled(settings.completion.enabled);

    println!("project: {} ({})", session.project().title, session.project_id());
    println!("files: {}", session.tree().files().len());

    match session.start_runtime().await {
        Ok(handle) => println!("sandbox: ready (generation {})", handle.generation()),
        Err(err) => println!("sandbox: unavailable ({err})"),
    }

    if let Some(path) = open_path {
        match session.select_file(&path) {
            Some(_) => {
                if let Some(active) = session.files().active() {
                    let language = active
                        .language()
                        .map(|l| l.display_name())
                        .unwrap_or("Plain Text");
                    println!(
                        "opened: {} [{}] {} lines",
                        active.path(),
                        language,
                        active.buffer().lines().count()
                    );
                }
            }
            None => println!("not a file: {path}"),
        }
    }

    if let Err(err) = runtime.destroy().await {
        tracing::warn!(error = %err, "failed to tear down sandbox");
    }
    Ok(())
}
