// app.rs
use crate::store::{self, StoreClient, StoreConfig, TaskStore};
use crate::task::{Task, TaskDraft};
use chrono::{Local, NaiveDate};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SetupStep {
    Url,
    ApiKey,
}

#[derive(Debug, PartialEq)]
pub enum InputMode {
    Normal,
    EditingJob,
    EditingAssignor,
    EditingDeadline,
    EditingFinishDate,
    EditingJobdesc,
    ConfirmingDelete,
    EditingSetup, // store setup flow
}

impl Default for InputMode {
    fn default() -> Self {
        InputMode::Normal
    }
}

const NOT_CONFIGURED: &str = "Remote store is not configured. Press 's' to run setup.";

/// Owns the task list, the form draft and every remote operation. The
/// list is never patched in place: each successful mutation refetches the
/// whole collection so the view always shows what the store persisted.
pub struct App {
    pub store: Option<Box<dyn TaskStore>>,
    pub store_config: Option<StoreConfig>,

    pub tasks: Vec<Task>,
    pub loading: bool,
    pub submitting: bool,
    pub error_message: Option<String>,

    pub draft: TaskDraft,
    pub input_mode: InputMode,
    pub selected: usize,
    pub pending_delete: Option<i64>,

    pub input_setup: String,
    pub setup_step: Option<SetupStep>,
}

impl Default for App {
    fn default() -> Self {
        App::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            store: None,
            store_config: store::load_config(),
            tasks: Vec::new(),
            loading: false,
            submitting: false,
            error_message: None,
            draft: TaskDraft::default(),
            input_mode: InputMode::Normal,
            selected: 0,
            pending_delete: None,
            input_setup: String::new(),
            setup_step: None,
        }
    }

    /// Build the shared store client from the saved config. Called once at
    /// startup and once more when the setup flow completes.
    pub fn connect(&mut self) -> Result<(), String> {
        if self.store.is_some() {
            return Ok(());
        }
        let cfg = self
            .store_config
            .clone()
            .ok_or_else(|| NOT_CONFIGURED.to_string())?;
        let client = StoreClient::from_config(&cfg)?;
        self.store = Some(Box::new(client));
        Ok(())
    }

    /// Replace the task list with the store's current contents, newest
    /// first. On failure the list is emptied rather than left stale next
    /// to an error banner.
    pub fn refresh(&mut self) {
        self.loading = true;
        self.error_message = None;
        let result = match self.store.as_deref() {
            Some(store) => store.list_tasks(),
            None => Err(NOT_CONFIGURED.to_string()),
        };
        match result {
            Ok(tasks) => {
                self.tasks = tasks;
            }
            Err(e) => {
                self.tasks = Vec::new();
                self.error_message = Some(e);
            }
        }
        if self.selected >= self.tasks.len() {
            self.selected = self.tasks.len().saturating_sub(1);
        }
        self.loading = false;
    }

    fn validate_draft(&self) -> Result<(), String> {
        if self.draft.job.trim().is_empty()
            || self.draft.assignor.trim().is_empty()
            || self.draft.deadline.trim().is_empty()
        {
            return Err("Job, assignor and deadline must not be empty.".to_string());
        }
        let deadline = parse_input_date(self.draft.deadline.trim())?;
        let today = Local::now().date_naive();
        if deadline < today {
            return Err("Deadline must be today or a future date.".to_string());
        }
        if !self.draft.finishdate.trim().is_empty() {
            let finish = parse_input_date(self.draft.finishdate.trim())?;
            if finish > deadline {
                return Err("Finish date cannot be after the deadline.".to_string());
            }
        }
        Ok(())
    }

    /// Create or update depending on `editing_id`. Validation runs first
    /// and rejects without touching the network; a remote failure leaves
    /// the draft untouched so the user can retry.
    pub fn submit(&mut self) {
        if self.submitting {
            return;
        }
        if let Err(e) = self.validate_draft() {
            self.error_message = Some(e);
            return;
        }
        self.submitting = true;
        let fields = self.draft.to_fields();
        let result = match self.store.as_deref() {
            Some(store) => match self.draft.editing_id {
                Some(id) => store.update_task(id, &fields),
                None => store.insert_task(&fields),
            },
            None => Err(NOT_CONFIGURED.to_string()),
        };
        self.submitting = false;
        match result {
            Ok(()) => {
                self.draft.reset();
                self.input_mode = InputMode::Normal;
                self.refresh();
            }
            Err(e) => {
                self.error_message = Some(e);
            }
        }
    }

    pub fn begin_create(&mut self) {
        self.draft.reset();
        self.input_mode = InputMode::EditingJob;
        self.error_message = None;
    }

    /// Enter edit mode for the task under the cursor: the draft takes the
    /// task's current values and focus moves to the first form field.
    pub fn begin_edit_selected(&mut self) {
        if let Some(task) = self.tasks.get(self.selected) {
            self.draft.load_from(task);
            self.input_mode = InputMode::EditingJob;
            self.error_message = None;
        }
    }

    pub fn cancel_edit(&mut self) {
        self.draft.reset();
        self.input_mode = InputMode::Normal;
    }

    /// Deletion is two-step: this arms the confirmation prompt, nothing
    /// is sent until the user confirms.
    pub fn request_remove(&mut self) {
        if let Some(task) = self.tasks.get(self.selected) {
            self.pending_delete = Some(task.id);
            self.input_mode = InputMode::ConfirmingDelete;
        }
    }

    pub fn confirm_remove(&mut self) {
        let id = match self.pending_delete.take() {
            Some(id) => id,
            None => return,
        };
        self.input_mode = InputMode::Normal;
        self.loading = true;
        let result = match self.store.as_deref() {
            Some(store) => store.delete_task(id),
            None => Err(NOT_CONFIGURED.to_string()),
        };
        match result {
            Ok(()) => self.refresh(),
            Err(e) => {
                self.error_message = Some(e);
                self.loading = false;
            }
        }
    }

    pub fn decline_remove(&mut self) {
        self.pending_delete = None;
        self.input_mode = InputMode::Normal;
    }

    /// The task the confirmation prompt is asking about.
    pub fn pending_delete_task(&self) -> Option<&Task> {
        let id = self.pending_delete?;
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn start_setup(&mut self) {
        self.setup_step = Some(SetupStep::Url);
        self.input_setup = self
            .store_config
            .as_ref()
            .map(|c| c.project_url.clone())
            .unwrap_or_default();
        self.input_mode = InputMode::EditingSetup;
        self.error_message = None;
    }

    pub fn cancel_setup(&mut self) {
        self.setup_step = None;
        self.input_setup.clear();
        self.input_mode = InputMode::Normal;
    }

    pub fn submit_setup(&mut self) {
        let step = match self.setup_step {
            Some(s) => s,
            None => return,
        };
        let mut cfg = self.store_config.clone().unwrap_or_default();
        match step {
            SetupStep::Url => {
                cfg.project_url = self.input_setup.trim().trim_end_matches('/').to_string();
                self.input_setup.clear();
                // persist partial config so the next step sees the URL
                self.store_config = Some(cfg);
                self.setup_step = Some(SetupStep::ApiKey);
            }
            SetupStep::ApiKey => {
                cfg.api_key = self.input_setup.trim().to_string();
                self.input_setup.clear();
                self.setup_step = None;
                self.input_mode = InputMode::Normal;
                match StoreClient::from_config(&cfg) {
                    Ok(client) => {
                        if let Err(e) = store::save_config(&cfg) {
                            self.error_message = Some(e);
                        }
                        self.store_config = Some(cfg);
                        self.store = Some(Box::new(client));
                        self.refresh();
                    }
                    Err(e) => {
                        self.error_message = Some(format!("Store setup failed: {}", e));
                    }
                }
            }
        }
    }
}

pub fn parse_input_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}'. Use YYYY-MM-DD.", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskFields;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        List,
        Insert(TaskFields),
        Update(i64, TaskFields),
        Delete(i64),
    }

    #[derive(Default)]
    struct MockState {
        rows: Vec<Task>,
        calls: Vec<Call>,
        fail_with: Option<String>,
    }

    // Shared-state mock: clones see the same rows and call log, so a test
    // can keep a handle while the app owns its own.
    #[derive(Clone, Default)]
    struct MockStore {
        state: Rc<RefCell<MockState>>,
    }

    impl MockStore {
        fn calls(&self) -> Vec<Call> {
            self.state.borrow().calls.clone()
        }

        fn seed(&self, id: i64, job: &str) {
            let mut s = self.state.borrow_mut();
            let created_at = format!("2024-05-{:02}T10:00:00+00:00", id);
            s.rows.push(Task {
                id,
                created_at,
                job: job.to_string(),
                assignor: "Manager".to_string(),
                jobdesc: None,
                deadline: "2099-01-01".to_string(),
                finishdate: None,
            });
        }

        fn fail_with(&self, msg: &str) {
            self.state.borrow_mut().fail_with = Some(msg.to_string());
        }

        fn recover(&self) {
            self.state.borrow_mut().fail_with = None;
        }
    }

    impl TaskStore for MockStore {
        fn list_tasks(&self) -> Result<Vec<Task>, String> {
            let mut s = self.state.borrow_mut();
            s.calls.push(Call::List);
            if let Some(e) = s.fail_with.clone() {
                return Err(e);
            }
            let mut rows = s.rows.clone();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }

        fn insert_task(&self, fields: &TaskFields) -> Result<(), String> {
            let mut s = self.state.borrow_mut();
            s.calls.push(Call::Insert(fields.clone()));
            if let Some(e) = s.fail_with.clone() {
                return Err(e);
            }
            let id = s.rows.iter().map(|t| t.id).max().unwrap_or(0) + 1;
            let created_at = format!("2024-05-{:02}T10:00:00+00:00", id);
            s.rows.push(Task {
                id,
                created_at,
                job: fields.job.clone(),
                assignor: fields.assignor.clone(),
                jobdesc: fields.jobdesc.clone(),
                deadline: fields.deadline.clone(),
                finishdate: fields.finishdate.clone(),
            });
            Ok(())
        }

        fn update_task(&self, id: i64, fields: &TaskFields) -> Result<(), String> {
            let mut s = self.state.borrow_mut();
            s.calls.push(Call::Update(id, fields.clone()));
            if let Some(e) = s.fail_with.clone() {
                return Err(e);
            }
            if let Some(row) = s.rows.iter_mut().find(|t| t.id == id) {
                row.job = fields.job.clone();
                row.assignor = fields.assignor.clone();
                row.jobdesc = fields.jobdesc.clone();
                row.deadline = fields.deadline.clone();
                row.finishdate = fields.finishdate.clone();
            }
            Ok(())
        }

        fn delete_task(&self, id: i64) -> Result<(), String> {
            let mut s = self.state.borrow_mut();
            s.calls.push(Call::Delete(id));
            if let Some(e) = s.fail_with.clone() {
                return Err(e);
            }
            s.rows.retain(|t| t.id != id);
            Ok(())
        }
    }

    fn app_with(mock: &MockStore) -> App {
        let mut app = App::new();
        app.store = Some(Box::new(mock.clone()));
        app
    }

    fn fill_valid_draft(app: &mut App) {
        app.draft.job = "Report".to_string();
        app.draft.assignor = "Manager".to_string();
        app.draft.deadline = "2099-01-01".to_string();
    }

    #[test]
    fn test_create_submit_adds_row_and_resets_draft() {
        let mock = MockStore::default();
        mock.seed(1, "Existing");
        let mut app = app_with(&mock);
        app.refresh();
        assert_eq!(app.tasks.len(), 1);

        fill_valid_draft(&mut app);
        app.submit();

        assert_eq!(app.error_message, None);
        assert_eq!(app.tasks.len(), 2);
        // newest first, so the created task leads the list
        assert_eq!(app.tasks[0].job, "Report");
        assert!(app.draft.is_default());
        assert!(!app.submitting);
        let calls = mock.calls();
        match &calls[1] {
            Call::Insert(fields) => {
                assert_eq!(fields.job, "Report");
                assert_eq!(fields.jobdesc, None);
                // blank finish date reaches the store as null
                assert_eq!(fields.finishdate, None);
            }
            other => panic!("expected insert, got {:?}", other),
        }
        assert_eq!(calls[2], Call::List);
    }

    #[test]
    fn test_edit_submit_updates_row_and_leaves_edit_mode() {
        let mock = MockStore::default();
        mock.seed(7, "Old job");
        let mut app = app_with(&mock);
        app.refresh();

        app.begin_edit_selected();
        assert_eq!(app.draft.editing_id, Some(7));
        app.draft.job = "New job".to_string();
        app.submit();

        assert_eq!(app.draft.editing_id, None);
        assert!(app.draft.is_default());
        assert_eq!(app.tasks[0].job, "New job");
        let calls = mock.calls();
        match &calls[1] {
            Call::Update(id, fields) => {
                assert_eq!(*id, 7);
                assert_eq!(fields.job, "New job");
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_fields_never_reach_the_store() {
        let mock = MockStore::default();
        let mut app = app_with(&mock);
        app.draft.job = "Report".to_string();
        app.submit();
        assert!(
            app.error_message
                .as_deref()
                .unwrap()
                .contains("must not be empty")
        );
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_past_deadline_is_rejected() {
        let mock = MockStore::default();
        let mut app = app_with(&mock);
        fill_valid_draft(&mut app);
        app.draft.deadline = "2000-01-01".to_string();
        app.submit();
        assert_eq!(
            app.error_message.as_deref(),
            Some("Deadline must be today or a future date.")
        );
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_finish_date_after_deadline_is_rejected() {
        let mock = MockStore::default();
        let mut app = app_with(&mock);
        fill_valid_draft(&mut app);
        app.draft.finishdate = "2099-03-01".to_string();
        app.submit();
        assert_eq!(
            app.error_message.as_deref(),
            Some("Finish date cannot be after the deadline.")
        );
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_unparseable_deadline_is_rejected() {
        let mock = MockStore::default();
        let mut app = app_with(&mock);
        fill_valid_draft(&mut app);
        app.draft.deadline = "next friday".to_string();
        app.submit();
        assert!(
            app.error_message
                .as_deref()
                .unwrap()
                .contains("Use YYYY-MM-DD")
        );
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_remote_failure_preserves_draft_for_retry() {
        let mock = MockStore::default();
        let mut app = app_with(&mock);
        fill_valid_draft(&mut app);
        mock.fail_with("Create task failed: HTTP 401 - bad key");
        app.submit();
        assert_eq!(
            app.error_message.as_deref(),
            Some("Create task failed: HTTP 401 - bad key")
        );
        assert_eq!(app.draft.job, "Report");
        assert_eq!(app.draft.editing_id, None);
        // insert attempted, but no refetch after a failed write
        assert_eq!(mock.calls().len(), 1);
    }

    #[test]
    fn test_declined_remove_touches_nothing() {
        let mock = MockStore::default();
        mock.seed(3, "Keep me");
        let mut app = app_with(&mock);
        app.refresh();
        let calls_before = mock.calls().len();

        app.request_remove();
        assert_eq!(app.pending_delete, Some(3));
        app.decline_remove();

        assert_eq!(app.pending_delete, None);
        assert_eq!(app.tasks.len(), 1);
        assert_eq!(mock.calls().len(), calls_before);
    }

    #[test]
    fn test_confirmed_remove_deletes_and_refetches() {
        let mock = MockStore::default();
        mock.seed(3, "Remove me");
        let mut app = app_with(&mock);
        app.refresh();

        app.request_remove();
        app.confirm_remove();

        assert!(app.tasks.is_empty());
        assert!(!app.loading);
        let calls = mock.calls();
        assert_eq!(calls[1], Call::Delete(3));
        assert_eq!(calls[2], Call::List);
    }

    #[test]
    fn test_failed_remove_keeps_last_fetched_list() {
        let mock = MockStore::default();
        mock.seed(3, "Sticky");
        let mut app = app_with(&mock);
        app.refresh();

        mock.fail_with("Delete task failed: HTTP 500 - boom");
        app.request_remove();
        app.confirm_remove();

        assert_eq!(app.tasks.len(), 1);
        assert!(!app.loading);
        assert!(app.error_message.as_deref().unwrap().contains("HTTP 500"));
    }

    #[test]
    fn test_refresh_failure_empties_list_and_sets_error() {
        let mock = MockStore::default();
        mock.seed(1, "A");
        let mut app = app_with(&mock);
        app.refresh();
        assert_eq!(app.tasks.len(), 1);

        mock.fail_with("List tasks failed: HTTP 503 - down");
        app.refresh();
        assert!(app.tasks.is_empty());
        assert!(app.error_message.is_some());
        assert!(!app.loading);

        mock.recover();
        app.refresh();
        assert_eq!(app.tasks.len(), 1);
        assert_eq!(app.error_message, None);
    }

    #[test]
    fn test_refresh_keeps_store_order_newest_first() {
        let mock = MockStore::default();
        mock.seed(1, "Older");
        mock.seed(2, "Newer");
        let mut app = app_with(&mock);
        app.refresh();
        assert_eq!(app.tasks[0].id, 2);
        assert_eq!(app.tasks[1].id, 1);
    }

    #[test]
    fn test_begin_edit_then_cancel_restores_defaults() {
        let mock = MockStore::default();
        mock.seed(5, "Edit me");
        let mut app = app_with(&mock);
        app.refresh();
        let calls_before = mock.calls().len();

        app.begin_edit_selected();
        assert_eq!(app.draft.job, "Edit me");
        assert_eq!(app.draft.editing_id, Some(5));
        assert_eq!(app.input_mode, InputMode::EditingJob);

        app.cancel_edit();
        assert!(app.draft.is_default());
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(mock.calls().len(), calls_before);
    }

    #[test]
    fn test_submit_without_store_reports_setup_hint() {
        let mut app = App::new();
        app.store = None;
        app.store_config = None;
        fill_valid_draft(&mut app);
        app.submit();
        assert!(
            app.error_message
                .as_deref()
                .unwrap()
                .contains("not configured")
        );
        assert_eq!(app.draft.job, "Report");
    }
}
