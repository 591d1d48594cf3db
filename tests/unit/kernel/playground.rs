use super::*;
use crate::kernel::services::adapters::InMemoryPlaygroundStore;
use crate::kernel::services::ports::{
    BoxFuture, CompletionClient, CompletionRequest, CompletionResponse, NewProject,
    RuntimeState, SandboxError, SandboxInstance, SandboxProvider, Template, UpstreamError,
};
use crate::kernel::suggestion::SuggestionPhase;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

#[derive(Default)]
struct RecordingSandbox {
    writes: Mutex<Vec<(String, String)>>,
}

impl SandboxInstance for RecordingSandbox {
    fn mkdir<'a>(&'a self, _path: &'a str, _recursive: bool) -> BoxFuture<'a, Result<(), SandboxError>> {
        Box::pin(async { Ok(()) })
    }

    fn write_file<'a>(
        &'a self,
        path: &'a str,
        content: &'a str,
    ) -> BoxFuture<'a, Result<(), SandboxError>> {
        self.writes
            .lock()
            .unwrap()
            .push((path.to_string(), content.to_string()));
        Box::pin(async { Ok(()) })
    }

    fn teardown(&self) -> BoxFuture<'_, Result<(), SandboxError>> {
        Box::pin(async { Ok(()) })
    }
}

#[derive(Default)]
struct FakeProvider {
    boots: AtomicUsize,
    fail_first: bool,
    sandbox: Arc<RecordingSandbox>,
}

impl SandboxProvider for FakeProvider {
    fn boot(&self) -> BoxFuture<'_, Result<Arc<dyn SandboxInstance>, SandboxError>> {
        let attempt = self.boots.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_first && attempt == 0 {
            Err(SandboxError::new("cross-origin isolation required"))
        } else {
            Ok(Arc::clone(&self.sandbox) as Arc<dyn SandboxInstance>)
        };
        Box::pin(async move { result })
    }
}

struct FixedCompletion(Option<&'static str>);

impl CompletionClient for FixedCompletion {
    fn complete(
        &self,
        _request: CompletionRequest,
    ) -> BoxFuture<'_, Result<CompletionResponse, UpstreamError>> {
        let suggestion = self.0.map(str::to_string);
        Box::pin(async move { Ok(CompletionResponse { suggestion }) })
    }
}

struct Fixture {
    store: Arc<InMemoryPlaygroundStore>,
    provider: Arc<FakeProvider>,
    services: SessionServices,
    project_id: String,
}

fn fixture_with(provider: FakeProvider, completion: Option<&'static str>) -> Fixture {
    let store = Arc::new(InMemoryPlaygroundStore::new());
    let meta = store.insert(NewProject {
        title: "Counter".to_string(),
        description: None,
        template: Template::React,
        tree: VirtualFileTree::from_files(
            "counter",
            [
                ("package.json", "{}"),
                ("src/index.js", "a"),
                ("src/App.jsx", "export default App"),
            ],
        )
        .unwrap(),
    });
    let provider = Arc::new(provider);
    let services = SessionServices {
        store: store.clone(),
        runtime: Arc::new(SandboxRuntimeManager::new(provider.clone())),
        suggestions: SuggestionRunner::new(Arc::new(FixedCompletion(completion))),
    };
    Fixture {
        store,
        provider,
        services,
        project_id: meta.id,
    }
}

fn fixture() -> Fixture {
    fixture_with(FakeProvider::default(), Some("1: b"))
}

fn load(fx: &Fixture) -> PlaygroundSession {
    block_on(PlaygroundSession::load(fx.services.clone(), &fx.project_id)).unwrap()
}

fn index_js() -> NodePath {
    NodePath::parse("src/index.js")
}

#[test]
fn loading_an_unknown_project_fails() {
    let fx = fixture();

    let err = block_on(PlaygroundSession::load(fx.services.clone(), "pg-missing"))
        .err()
        .unwrap();

    assert!(matches!(err, PlaygroundError::ProjectNotFound(id) if id == "pg-missing"));
}

#[test]
fn edit_and_save_persist_and_update_the_snapshot() {
    let fx = fixture();
    let mut session = load(&fx);
    let id = session.select_file(&index_js()).unwrap();

    assert!(session.edit_active("ab"));
    assert!(session.has_unsaved_changes());
    let report = block_on(session.save_active_file()).unwrap();

    assert_eq!(report.file_id, id);
    assert!(!report.mirrored);
    assert!(!session.has_unsaved_changes());
    assert_eq!(session.tree().file(&index_js()).unwrap().content, "ab");
    let stored = block_on(fx.store.load_project(&fx.project_id)).unwrap().unwrap();
    assert_eq!(stored.tree.file(&index_js()).unwrap().content, "ab");
}

#[test]
fn saving_without_an_active_tab_fails() {
    let fx = fixture();
    let mut session = load(&fx);

    let err = block_on(session.save_active_file()).unwrap_err();

    assert!(matches!(err, PlaygroundError::NoActiveFile));
}

#[test]
fn failed_persistence_keeps_the_tab_dirty() {
    let fx = fixture();
    let mut session = load(&fx);
    session.select_file(&index_js()).unwrap();
    session.edit_active("ab");
    block_on(fx.store.delete_project(&fx.project_id)).unwrap();

    let err = block_on(session.save_active_file()).unwrap_err();

    assert!(matches!(err, PlaygroundError::Persistence(_)));
    assert!(session.has_unsaved_changes());
    assert_eq!(session.tree().file(&index_js()).unwrap().content, "a");
}

#[test]
fn start_runtime_mirrors_the_tree_and_later_saves() {
    let fx = fixture();
    let mut session = load(&fx);

    block_on(session.start_runtime()).unwrap();
    assert_eq!(
        session.runtime_status(),
        &RuntimeStatus {
            loading: false,
            error: None,
            attached: true,
        }
    );
    assert_eq!(fx.provider.sandbox.writes.lock().unwrap().len(), 3);

    session.select_file(&index_js()).unwrap();
    session.edit_active("ab");
    let report = block_on(session.save_active_file()).unwrap();

    assert!(report.mirrored);
    assert_eq!(
        fx.provider.sandbox.writes.lock().unwrap().last(),
        Some(&("src/index.js".to_string(), "ab".to_string()))
    );
}

#[test]
fn boot_failure_is_recorded_and_the_next_start_retries() {
    let fx = fixture_with(
        FakeProvider {
            fail_first: true,
            ..FakeProvider::default()
        },
        None,
    );
    let mut session = load(&fx);

    assert!(block_on(session.start_runtime()).is_err());
    let status = session.runtime_status().clone();
    assert!(!status.loading);
    assert!(!status.attached);
    assert!(status.error.unwrap().contains("cross-origin isolation required"));

    block_on(session.start_runtime()).unwrap();
    assert!(session.runtime_status().error.is_none());
    assert_eq!(fx.provider.boots.load(Ordering::SeqCst), 2);
}

#[test]
fn sessions_share_the_runtime_and_dropping_one_keeps_it() {
    let fx = fixture();
    let mut first = load(&fx);
    let mut second = load(&fx);

    let a = block_on(first.start_runtime()).unwrap();
    let b = block_on(second.start_runtime()).unwrap();
    drop(first);

    assert!(a.same_instance(&b));
    assert_eq!(fx.provider.boots.load(Ordering::SeqCst), 1);
    assert_eq!(fx.services.runtime.state(), RuntimeState::Ready);
}

#[test]
fn save_all_saves_only_dirty_tabs() {
    let fx = fixture();
    let mut session = load(&fx);
    let index = session.select_file(&index_js()).unwrap();
    let app = session.select_file(&NodePath::parse("src/App.jsx")).unwrap();
    session.select_file(&NodePath::parse("package.json")).unwrap();
    session.edit(&index, "ab");
    session.edit(&app, "export default Counter");

    let reports = block_on(session.save_all());

    let saved: Vec<_> = reports.iter().map(|(id, r)| (id.clone(), r.is_ok())).collect();
    assert_eq!(saved, vec![(index, true), (app, true)]);
    assert!(!session.has_unsaved_changes());
}

#[test]
fn reload_replaces_the_tree_and_keeps_open_buffers() {
    let fx = fixture();
    let mut session = load(&fx);
    let id = session.select_file(&index_js()).unwrap();
    session.edit(&id, "local edit");
    block_on(fx.store.save_file(&fx.project_id, &index_js(), "remote")).unwrap();

    let closed = block_on(session.reload()).unwrap();

    assert!(closed.is_empty());
    assert_eq!(session.tree().file(&index_js()).unwrap().content, "remote");
    assert_eq!(session.editor_content(), "local edit");
    assert_eq!(session.files().active_id(), Some(&id));
}

#[test]
fn reload_closes_tabs_whose_file_was_removed() {
    let fx = fixture();
    let mut session = load(&fx);
    let app = session.select_file(&NodePath::parse("src/App.jsx")).unwrap();
    let index = session.select_file(&index_js()).unwrap();
    session.edit(&index, "ab");
    let without_index = VirtualFileTree::from_files(
        "counter",
        [("package.json", "{}"), ("src/App.jsx", "export default App")],
    )
    .unwrap();
    fx.store.replace_tree(&fx.project_id, without_index).unwrap();

    let closed = block_on(session.reload()).unwrap();

    assert_eq!(closed, vec![index.clone()]);
    assert!(session.files().get(&index).is_none());
    assert_eq!(session.files().active_id(), Some(&app));
    assert!(!session.has_unsaved_changes());
}

#[test]
fn reload_that_removes_the_only_tab_clears_the_active_file() {
    let fx = fixture();
    let mut session = load(&fx);
    session.select_file(&index_js()).unwrap();
    fx.store
        .replace_tree(&fx.project_id, VirtualFileTree::empty("counter"))
        .unwrap();

    block_on(session.reload()).unwrap();

    assert!(session.files().active_id().is_none());
    assert_eq!(session.editor_content(), "");
    assert!(matches!(
        block_on(session.save_active_file()),
        Err(PlaygroundError::NoActiveFile)
    ));
}

#[test]
fn saving_a_tab_that_is_not_open_names_it() {
    let fx = fixture();
    let mut session = load(&fx);
    let ghost = FileId::for_path(&index_js());

    let err = block_on(session.save_file(&ghost)).unwrap_err();

    assert!(matches!(&err, PlaygroundError::NotOpen(id) if id == &ghost));
    assert_eq!(err.to_string(), "src/index.js is not open");
}

#[test]
fn accepted_suggestion_lands_in_the_requesting_tab() {
    let fx = fixture();
    let mut session = load(&fx);
    session.select_file(&index_js()).unwrap();

    let effects = block_on(session.request_suggestion(
        SuggestionKind::Explicit,
        CursorPosition::new(0, 1),
    ));
    assert!(effects.is_empty());
    assert_eq!(session.suggestion().pending().unwrap().text, "1: b");

    assert!(session.accept_suggestion().state_changed);

    assert_eq!(session.editor_content(), "ab");
    assert!(session.has_unsaved_changes());
    assert_eq!(session.suggestion().phase(), &SuggestionPhase::Idle);
}

#[test]
fn accept_is_a_noop_once_the_requesting_tab_is_closed() {
    let fx = fixture();
    let mut session = load(&fx);
    let id = session.select_file(&index_js()).unwrap();
    block_on(session.request_suggestion(SuggestionKind::Passive, CursorPosition::new(0, 1)));

    session.close_file(&id);

    assert!(!session.accept_suggestion().state_changed);
    assert!(session.suggestion().pending().is_some());
    assert!(session.reject_suggestion().state_changed);
}

#[test]
fn suggestions_need_an_active_file_and_respect_the_toggle() {
    let fx = fixture();
    let mut session = load(&fx);

    assert!(session
        .begin_suggestion(SuggestionKind::Explicit, CursorPosition::default())
        .effects
        .is_empty());

    session.select_file(&index_js()).unwrap();
    session.set_suggestions_enabled(false);
    assert!(session
        .begin_suggestion(SuggestionKind::Explicit, CursorPosition::default())
        .effects
        .is_empty());

    session.toggle_suggestions();
    let dispatch = session.begin_suggestion(SuggestionKind::Explicit, CursorPosition::default());
    assert!(matches!(
        dispatch.effects.as_slice(),
        [SuggestionEffect::Request(request)] if request.file_content == "a"
    ));
}
