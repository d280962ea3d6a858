// task.rs

use serde::{Deserialize, Serialize};

/// One row of the remote `todos` table. Field names match the remote
/// columns; `id` and `created_at` are assigned by the store on insert and
/// never sent back on writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub created_at: String,
    pub job: String,
    pub assignor: String,
    pub jobdesc: Option<String>,
    pub deadline: String,
    pub finishdate: Option<String>,
}

/// The writable field subset sent on insert and update. `None` serializes
/// as an explicit JSON null so an update can clear `jobdesc`/`finishdate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskFields {
    pub job: String,
    pub assignor: String,
    pub jobdesc: Option<String>,
    pub deadline: String,
    pub finishdate: Option<String>,
}

/// Transient form state. Every input is a plain text buffer where empty
/// means unset; `editing_id` selects update mode when present.
#[derive(Debug, Default)]
pub struct TaskDraft {
    pub job: String,
    pub assignor: String,
    pub jobdesc: String,
    pub deadline: String,
    pub finishdate: String,
    pub editing_id: Option<i64>,
}

impl TaskDraft {
    pub fn reset(&mut self) {
        self.job.clear();
        self.assignor.clear();
        self.jobdesc.clear();
        self.deadline.clear();
        self.finishdate.clear();
        self.editing_id = None;
    }

    pub fn load_from(&mut self, task: &Task) {
        self.job = task.job.clone();
        self.assignor = task.assignor.clone();
        self.jobdesc = task.jobdesc.clone().unwrap_or_default();
        self.deadline = task.deadline.clone();
        self.finishdate = task.finishdate.clone().unwrap_or_default();
        self.editing_id = Some(task.id);
    }

    pub fn is_default(&self) -> bool {
        self.job.is_empty()
            && self.assignor.is_empty()
            && self.jobdesc.is_empty()
            && self.deadline.is_empty()
            && self.finishdate.is_empty()
            && self.editing_id.is_none()
    }

    /// Writable fields as they should reach the store: blank optional
    /// inputs become null.
    pub fn to_fields(&self) -> TaskFields {
        let jobdesc = self.jobdesc.trim();
        let finishdate = self.finishdate.trim();
        TaskFields {
            job: self.job.trim().to_string(),
            assignor: self.assignor.trim().to_string(),
            jobdesc: if jobdesc.is_empty() {
                None
            } else {
                Some(jobdesc.to_string())
            },
            deadline: self.deadline.trim().to_string(),
            finishdate: if finishdate.is_empty() {
                None
            } else {
                Some(finishdate.to_string())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_store_rows() {
        let body = r#"[
            {"id": 12, "created_at": "2024-05-02T10:11:12.345+00:00",
             "job": "Report", "assignor": "Manager", "jobdesc": null,
             "deadline": "2099-01-01", "finishdate": null},
            {"id": 9, "created_at": "2024-05-01T08:00:00+00:00",
             "job": "Slides", "assignor": "Lead", "jobdesc": "for the review",
             "deadline": "2099-02-01", "finishdate": "2099-01-20"}
        ]"#;
        let tasks: Vec<Task> = serde_json::from_str(body).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, 12);
        assert_eq!(tasks[0].jobdesc, None);
        assert_eq!(tasks[1].finishdate.as_deref(), Some("2099-01-20"));
    }

    #[test]
    fn test_blank_optionals_become_null() {
        let draft = TaskDraft {
            job: "Report".to_string(),
            assignor: "Manager".to_string(),
            jobdesc: "  ".to_string(),
            deadline: "2099-01-01".to_string(),
            finishdate: String::new(),
            editing_id: None,
        };
        let fields = draft.to_fields();
        assert_eq!(fields.jobdesc, None);
        assert_eq!(fields.finishdate, None);
        let json = serde_json::to_value(&fields).unwrap();
        assert!(json.get("finishdate").unwrap().is_null());
    }

    #[test]
    fn test_load_from_and_reset() {
        let task = Task {
            id: 4,
            created_at: "2024-05-01T08:00:00+00:00".to_string(),
            job: "Report".to_string(),
            assignor: "Manager".to_string(),
            jobdesc: None,
            deadline: "2099-01-01".to_string(),
            finishdate: None,
        };
        let mut draft = TaskDraft::default();
        draft.load_from(&task);
        assert_eq!(draft.editing_id, Some(4));
        assert_eq!(draft.jobdesc, "");
        draft.reset();
        assert!(draft.is_default());
    }
}
