use std::collections::HashSet;

use sauron::{
    html::{attributes::*, *},
    prelude::*,
};
use serde::de::DeserializeOwned;
use shared::{
    CreateTaskRequest, ErrorBody, MessageBody, Task, TaskId, TaskList, UpdateTaskRequest,
};
use wasm_bindgen_futures::JsFuture;
use web_sys::{console, window, Request, RequestInit, Response};

const API_ROOT: &str = "/api/todos";

#[derive(Debug, Clone)]
pub enum Msg {
    LoadTasks,
    TasksLoaded(Vec<Task>),
    SetNewTaskTitle(String),
    SetNewTaskDescription(String),
    CreateTask,
    TaskCreated(Task),
    ToggleTask(TaskId),
    TaskUpdated(Task),
    DeleteTask(TaskId),
    TaskDeleted(TaskId),
    EditTask(TaskId),
    SetEditTitle(String),
    SetEditDescription(String),
    SaveEdit(TaskId),
    CancelEdit,
    ClearCompleted,
    ToggleCompletedSection,
    RequestFailed {
        task: Option<TaskId>,
        error: String,
    },
    DismissError,
    Noop,
}

/// UI state. `tasks` only ever changes in response to the server; `busy` marks
/// tasks with a request in flight so their controls are disabled meanwhile.
#[derive(Debug, Clone)]
pub struct Model {
    tasks: TaskList,
    new_task_title: String,
    new_task_description: String,
    editing_task: Option<TaskId>,
    edit_title: String,
    edit_description: String,
    loading: bool,
    creating: bool,
    show_completed: bool,
    busy: HashSet<TaskId>,
    error: Option<String>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            tasks: TaskList::new(),
            new_task_title: String::new(),
            new_task_description: String::new(),
            editing_task: None,
            edit_title: String::new(),
            edit_description: String::new(),
            loading: true,
            creating: false,
            show_completed: true,
            busy: HashSet::new(),
            error: None,
        }
    }
}

impl Application for Model {
    type MSG = Msg;

    fn init(&mut self) -> Cmd<Msg> {
        Cmd::new(async { Msg::LoadTasks })
    }

    fn update(&mut self, msg: Msg) -> Cmd<Msg> {
        match msg {
            Msg::LoadTasks => {
                self.loading = true;
                Cmd::new(async {
                    match fetch_tasks().await {
                        Ok(tasks) => Msg::TasksLoaded(tasks),
                        Err(error) => Msg::RequestFailed { task: None, error },
                    }
                })
            }
            Msg::TasksLoaded(tasks) => {
                self.tasks.reset(tasks);
                self.loading = false;
                Cmd::none()
            }
            Msg::SetNewTaskTitle(task_title) => {
                self.new_task_title = task_title;
                Cmd::none()
            }
            Msg::SetNewTaskDescription(description) => {
                self.new_task_description = description;
                Cmd::none()
            }
            Msg::CreateTask => {
                if self.creating || self.new_task_title.trim().is_empty() {
                    return Cmd::none();
                }
                self.creating = true;

                let description = Some(self.new_task_description.clone())
                    .filter(|description| !description.trim().is_empty());
                let request = CreateTaskRequest::new(self.new_task_title.clone(), description);

                Cmd::new(async move {
                    match create_task(&request).await {
                        Ok(task) => Msg::TaskCreated(task),
                        Err(error) => Msg::RequestFailed { task: None, error },
                    }
                })
            }
            Msg::TaskCreated(task) => {
                self.creating = false;
                self.new_task_title.clear();
                self.new_task_description.clear();
                self.tasks.insert_created(task);
                Cmd::none()
            }
            Msg::ToggleTask(id) => {
                let Some(task) = self.tasks.get(id) else {
                    return Cmd::none();
                };
                if !self.busy.insert(id) {
                    return Cmd::none();
                }
                let patch = UpdateTaskRequest::completed(!task.completed);
                Cmd::new(async move { update_msg(id, patch).await })
            }
            Msg::TaskUpdated(task) => {
                self.busy.remove(&task.id);
                if self.editing_task == Some(task.id) {
                    self.editing_task = None;
                    self.edit_title.clear();
                    self.edit_description.clear();
                }
                if !self.tasks.replace(task) {
                    console::log_1(&"Updated todo is no longer listed".into());
                }
                Cmd::none()
            }
            Msg::DeleteTask(id) => {
                if self.busy.contains(&id) || !confirm("Are you sure you want to delete this todo?")
                {
                    return Cmd::none();
                }
                self.busy.insert(id);
                Cmd::new(async move { delete_msg(id).await })
            }
            Msg::TaskDeleted(id) => {
                self.busy.remove(&id);
                self.tasks.remove(id);
                if self.editing_task == Some(id) {
                    self.editing_task = None;
                }
                Cmd::none()
            }
            Msg::EditTask(id) => {
                if let Some(task) = self.tasks.get(id) {
                    self.editing_task = Some(id);
                    self.edit_title = task.title.clone();
                    self.edit_description = task.description.clone().unwrap_or_default();
                }
                Cmd::none()
            }
            Msg::SetEditTitle(task_title) => {
                self.edit_title = task_title;
                Cmd::none()
            }
            Msg::SetEditDescription(description) => {
                self.edit_description = description;
                Cmd::none()
            }
            Msg::SaveEdit(id) => {
                if self.editing_task != Some(id)
                    || self.edit_title.trim().is_empty()
                    || !self.busy.insert(id)
                {
                    return Cmd::none();
                }
                // edit mode stays open until the server confirms
                let patch = UpdateTaskRequest::edit(self.edit_title.clone(), &self.edit_description);
                Cmd::new(async move { update_msg(id, patch).await })
            }
            Msg::CancelEdit => {
                self.editing_task = None;
                self.edit_title.clear();
                self.edit_description.clear();
                Cmd::none()
            }
            Msg::ClearCompleted => {
                let completed_ids: Vec<TaskId> = self
                    .tasks
                    .completed_ids()
                    .into_iter()
                    .filter(|id| !self.busy.contains(id))
                    .collect();
                if completed_ids.is_empty()
                    || !confirm("Are you sure you want to clear all completed todos?")
                {
                    return Cmd::none();
                }

                self.busy.extend(completed_ids.iter().copied());
                Cmd::batch(
                    completed_ids
                        .into_iter()
                        .map(|id| Cmd::new(async move { delete_msg(id).await }))
                        .collect::<Vec<_>>(),
                )
            }
            Msg::ToggleCompletedSection => {
                self.show_completed = !self.show_completed;
                Cmd::none()
            }
            Msg::RequestFailed { task, error } => {
                console::error_1(&format!("Request failed: {}", error).into());
                if let Some(id) = task {
                    self.busy.remove(&id);
                }
                self.loading = false;
                self.creating = false;
                self.error = Some(error);
                Cmd::none()
            }
            Msg::DismissError => {
                self.error = None;
                Cmd::none()
            }
            Msg::Noop => Cmd::none(),
        }
    }

    fn view(&self) -> Node<Msg> {
        div(
            [class("min-h-screen bg-ctp-base text-ctp-text")],
            [
                self.view_header(),
                div(
                    [class("max-w-4xl mx-auto px-6 py-8 space-y-8")],
                    [
                        self.view_error(),
                        self.view_create_form(),
                        if self.loading {
                            div([class("text-center py-10 text-ctp-subtext0 italic")], [text("Loading...")])
                        } else {
                            self.view_task_list()
                        },
                        self.view_stats(),
                    ],
                ),
            ],
        )
    }
}

impl Model {
    fn view_header(&self) -> Node<Msg> {
        header([class("bg-ctp-mantle shadow-lg border-b border-ctp-surface0")], [
            div([class("max-w-4xl mx-auto px-6 py-4")], [
                h1([class("text-2xl font-bold text-ctp-text")], [text("Todo App")]),
            ]),
        ])
    }

    fn view_error(&self) -> Node<Msg> {
        match &self.error {
            Some(error) => div([class("flex items-center justify-between bg-ctp-red/20 text-ctp-red border border-ctp-red rounded-lg px-4 py-3")], [
                span([], [text(error)]),
                button([
                    on_click(|_| Msg::DismissError),
                    class("text-sm font-medium hover:underline"),
                    r#type("button"),
                ], [text("Dismiss")]),
            ]),
            None => span([], []),
        }
    }

    fn view_stats(&self) -> Node<Msg> {
        if self.tasks.is_empty() {
            return span([], []);
        }
        let stats = self.tasks.stats();
        div([class("grid grid-cols-1 md:grid-cols-3 gap-6")], [
            self.stat_card("Total", &stats.total.to_string(), "text-ctp-blue"),
            self.stat_card("Completed", &stats.completed.to_string(), "text-ctp-green"),
            self.stat_card("Pending", &stats.pending.to_string(), "text-ctp-peach"),
        ])
    }

    fn stat_card(&self, card_title: &str, value: &str, color_class: &str) -> Node<Msg> {
        div([class("bg-ctp-surface0 rounded-lg p-6 text-center border border-ctp-surface1")], [
            p([class(&format!("text-3xl font-bold {}", color_class))], [text(value)]),
            p([class("text-sm font-medium text-ctp-subtext0 mt-1")], [text(card_title)]),
        ])
    }

    fn view_create_form(&self) -> Node<Msg> {
        let can_submit = !self.creating && !self.new_task_title.trim().is_empty();
        div(
            [class("p-6 bg-ctp-surface0 rounded-lg border border-ctp-surface1")],
            [
                h2([class("text-xl font-semibold text-ctp-text mb-4 pb-2 border-b border-ctp-surface2")], [text("Add New Todo")]),
                div([class("space-y-4")], [
                    input([
                        r#type("text"),
                        placeholder("Todo title..."),
                        value(&self.new_task_title),
                        on_input(|event| Msg::SetNewTaskTitle(event.value())),
                        on_keydown(|event| submit_on_enter(&event.key(), Msg::CreateTask)),
                        class("w-full px-3 py-2 bg-ctp-surface1 border border-ctp-surface2 rounded-md text-ctp-text placeholder-ctp-subtext0 focus:outline-none focus:ring-2 focus:ring-ctp-blue focus:border-transparent"),
                    ], []),
                    input([
                        r#type("text"),
                        placeholder("Description (optional)..."),
                        value(&self.new_task_description),
                        on_input(|event| Msg::SetNewTaskDescription(event.value())),
                        on_keydown(|event| submit_on_enter(&event.key(), Msg::CreateTask)),
                        class("w-full px-3 py-2 bg-ctp-surface1 border border-ctp-surface2 rounded-md text-ctp-text placeholder-ctp-subtext0 focus:outline-none focus:ring-2 focus:ring-ctp-blue focus:border-transparent"),
                    ], []),
                    button([
                        on_click(|_| Msg::CreateTask),
                        disabled(!can_submit),
                        class("bg-ctp-blue hover:bg-ctp-sapphire text-ctp-base font-medium px-6 py-2 rounded-md transition-colors duration-200 disabled:opacity-50"),
                    ], [text(if self.creating { "Adding..." } else { "Add Todo" })]),
                ]),
            ],
        )
    }

    fn view_task_list(&self) -> Node<Msg> {
        let pending_tasks: Vec<&Task> = self.tasks.pending().collect();
        let completed_tasks: Vec<&Task> = self.tasks.completed().collect();

        if self.tasks.is_empty() {
            return div([class("text-center py-12 bg-ctp-surface0 rounded-lg border border-ctp-surface1")], [
                p([class("text-ctp-subtext0")], [text("No todos yet. Add one above to get started!")]),
            ]);
        }

        div(
            [class("space-y-8")],
            [
                div([], [
                    div([class("flex items-center justify-between mb-4")], [
                        h2([class("text-xl font-semibold text-ctp-text")], [text("Active")]),
                        span([class("bg-ctp-blue/20 text-ctp-blue px-2 py-1 rounded-full text-sm font-medium")], [
                            text(&format!("{} active", pending_tasks.len()))
                        ]),
                    ]),
                    if pending_tasks.is_empty() {
                        div([class("text-center py-8 text-ctp-subtext0")], [text("All caught up!")])
                    } else {
                        div(
                            [class("space-y-4")],
                            pending_tasks.iter().map(|task| self.view_task(task)).collect::<Vec<_>>(),
                        )
                    },
                ]),
                if completed_tasks.is_empty() {
                    span([], [])
                } else {
                    div([class("border-t border-ctp-surface1 pt-8")], [
                        div([class("flex items-center justify-between mb-4")], [
                            button([
                                on_click(|_| Msg::ToggleCompletedSection),
                                class("flex items-center space-x-2 text-xl font-semibold text-ctp-text hover:text-ctp-blue transition-colors duration-200"),
                            ], [
                                span([], [text("Completed")]),
                                span([class("text-sm")], [text(if self.show_completed { "▼" } else { "▶" })]),
                            ]),
                            div([class("flex items-center space-x-3")], [
                                span([class("bg-ctp-green/20 text-ctp-green px-2 py-1 rounded-full text-sm font-medium")], [
                                    text(&format!("{} completed", completed_tasks.len()))
                                ]),
                                button([
                                    on_click(|_| Msg::ClearCompleted),
                                    class("bg-ctp-red/20 text-ctp-red hover:bg-ctp-red/30 px-3 py-1 rounded-full text-sm font-medium transition-colors duration-200"),
                                ], [text("Clear All")]),
                            ]),
                        ]),
                        if self.show_completed {
                            div(
                                [class("space-y-3")],
                                completed_tasks.iter().map(|task| self.view_task(task)).collect::<Vec<_>>(),
                            )
                        } else {
                            span([], [])
                        },
                    ])
                },
            ],
        )
    }

    fn view_task(&self, task: &Task) -> Node<Msg> {
        let is_editing = self.editing_task == Some(task.id);
        let is_busy = self.busy.contains(&task.id);
        let task_id = task.id;

        div(
            [
                key(task.id.to_string()),
                class(&format!(
                    "border rounded-xl p-6 bg-ctp-surface0 shadow-sm transition-all duration-300 {}",
                    if task.completed {
                        "border-ctp-green bg-ctp-green/10 opacity-75"
                    } else {
                        "border-ctp-surface1 hover:border-ctp-blue"
                    }
                )),
            ],
            if is_editing {
                vec![self.view_edit_form(task_id, is_busy)]
            } else {
                vec![div([class("flex items-start gap-4")], [
                    input([
                        r#type("checkbox"),
                        checked(task.completed),
                        id(&format!("todo-{}", task.id)),
                        on_click(move |_| Msg::ToggleTask(task_id)),
                        disabled(is_busy),
                        class("mt-1 w-5 h-5 accent-ctp-green"),
                    ], []),
                    div([class("flex-1 min-w-0 space-y-1")], [
                        h3([class(&format!(
                            "text-lg font-semibold {}",
                            if task.completed { "line-through text-ctp-overlay1" } else { "text-ctp-text" }
                        ))], [text(&task.title)]),
                        match &task.description {
                            Some(description) => p([class(&format!(
                                "text-sm leading-relaxed break-words {}",
                                if task.completed { "text-ctp-overlay0 line-through" } else { "text-ctp-subtext1" }
                            ))], [text(description)]),
                            None => span([], []),
                        },
                        p([class("text-xs text-ctp-overlay0")], [
                            text(&format!("Created: {}", task.created_at.format("%Y-%m-%d")))
                        ]),
                    ]),
                    div([class("flex gap-2 flex-shrink-0")], [
                        button([
                            on_click(move |_| Msg::EditTask(task_id)),
                            class("inline-flex items-center justify-center w-8 h-8 rounded-lg bg-ctp-blue/20 text-ctp-blue hover:bg-ctp-blue/30 transition-colors duration-200"),
                            r#type("button"),
                            disabled(is_busy),
                        ], [text("✏️")]),
                        button([
                            on_click(move |_| Msg::DeleteTask(task_id)),
                            class("inline-flex items-center justify-center w-8 h-8 rounded-lg bg-ctp-red/20 text-ctp-red hover:bg-ctp-red/30 transition-colors duration-200"),
                            r#type("button"),
                            disabled(is_busy),
                        ], [text(if is_busy { "⏳" } else { "🗑️" })]),
                    ]),
                ])]
            },
        )
    }

    fn view_edit_form(&self, task_id: TaskId, is_busy: bool) -> Node<Msg> {
        div([class("space-y-3")], [
            input([
                r#type("text"),
                value(&self.edit_title),
                on_input(|event| Msg::SetEditTitle(event.value())),
                on_keydown(move |event| submit_on_enter(&event.key(), Msg::SaveEdit(task_id))),
                class("w-full px-3 py-2 bg-ctp-surface1 border border-ctp-surface2 rounded-md text-ctp-text focus:outline-none focus:ring-2 focus:ring-ctp-blue focus:border-transparent"),
            ], []),
            input([
                r#type("text"),
                placeholder("Description..."),
                value(&self.edit_description),
                on_input(|event| Msg::SetEditDescription(event.value())),
                on_keydown(move |event| submit_on_enter(&event.key(), Msg::SaveEdit(task_id))),
                class("w-full px-3 py-2 bg-ctp-surface1 border border-ctp-surface2 rounded-md text-ctp-text focus:outline-none focus:ring-2 focus:ring-ctp-blue focus:border-transparent"),
            ], []),
            div([class("flex gap-2")], [
                button([
                    on_click(move |_| Msg::SaveEdit(task_id)),
                    class("bg-ctp-green hover:bg-ctp-teal text-ctp-base font-medium px-4 py-2 rounded-md transition-colors duration-200"),
                    disabled(is_busy || self.edit_title.trim().is_empty()),
                ], [text(if is_busy { "Saving..." } else { "Save" })]),
                button([
                    on_click(|_| Msg::CancelEdit),
                    class("bg-ctp-overlay0 hover:bg-ctp-overlay1 text-ctp-text font-medium px-4 py-2 rounded-md transition-colors duration-200"),
                    disabled(is_busy),
                ], [text("Cancel")]),
            ]),
        ])
    }
}

fn submit_on_enter(key: &str, msg: Msg) -> Msg {
    if key == "Enter" {
        msg
    } else {
        Msg::Noop
    }
}

fn confirm(message: &str) -> bool {
    window()
        .and_then(|window| window.confirm_with_message(message).ok())
        .unwrap_or(false)
}

async fn update_msg(id: TaskId, patch: UpdateTaskRequest) -> Msg {
    match update_task(id, &patch).await {
        Ok(task) => Msg::TaskUpdated(task),
        Err(error) => Msg::RequestFailed {
            task: Some(id),
            error,
        },
    }
}

async fn delete_msg(id: TaskId) -> Msg {
    match delete_task(id).await {
        Ok(_) => Msg::TaskDeleted(id),
        Err(error) => Msg::RequestFailed {
            task: Some(id),
            error,
        },
    }
}

async fn fetch_tasks() -> Result<Vec<Task>, String> {
    send_json("GET", API_ROOT, None).await
}

async fn create_task(request: &CreateTaskRequest) -> Result<Task, String> {
    let body = serde_json::to_string(request).map_err(|_| "Failed to serialize request")?;
    send_json("POST", API_ROOT, Some(body)).await
}

async fn update_task(id: TaskId, patch: &UpdateTaskRequest) -> Result<Task, String> {
    let body = serde_json::to_string(patch).map_err(|_| "Failed to serialize request")?;
    send_json("PUT", &format!("{}/{}", API_ROOT, id), Some(body)).await
}

async fn delete_task(id: TaskId) -> Result<MessageBody, String> {
    send_json("DELETE", &format!("{}/{}", API_ROOT, id), None).await
}

/// Sends a request and decodes the JSON response. Non-2xx responses turn into
/// the server's `{"error": ...}` message.
async fn send_json<T: DeserializeOwned>(
    method: &str,
    url: &str,
    body: Option<String>,
) -> Result<T, String> {
    let opts = RequestInit::new();
    opts.set_method(method);
    if let Some(body) = &body {
        opts.set_body(&wasm_bindgen::JsValue::from_str(body));
    }

    let request = Request::new_with_str_and_init(url, &opts)
        .map_err(|_| "Failed to create request")?;

    if body.is_some() {
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(|_| "Failed to set header")?;
    }

    let promise = window()
        .ok_or("No window available")?
        .fetch_with_request(&request);

    let response: Response = JsFuture::from(promise)
        .await
        .map_err(|_| "Failed to send request")?
        .into();

    let text_promise = response.text().map_err(|_| "Failed to read response")?;
    let text = JsFuture::from(text_promise)
        .await
        .map_err(|_| "Failed to get text")?
        .as_string()
        .ok_or("Failed to convert to string")?;

    if !response.ok() {
        return Err(serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("Request failed with status {}", response.status())));
    }

    serde_json::from_str(&text).map_err(|e| format!("Failed to parse JSON: {}", e))
}

#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    Program::mount_to_body(Model::default());
}
