use clap::Subcommand;
use sticky_lib::{
    Note, NoteId, Result,
    lock::LockOutcome,
    query::{self, SortKey},
    repository::{Color, NoteDelta, Recurrence, Template},
    window::{Window, Workspace},
};
use sysexits::ExitCode;

use crate::terminal::{self, StdinPrompt};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a note
    New {
        #[arg(short, long, value_enum, default_value_t)]
        template: Template,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    /// List notes, optionally filtered by `tag:<tag>`, `folder:<folder>` or free text
    List {
        search: Option<String>,
        /// Only pinned notes
        #[arg(short, long)]
        pinned: bool,
        #[arg(short, long, value_enum, default_value_t)]
        sort: SortKey,
    },
    /// Print a note, asking for its password if it is locked
    Show { id: String },
    /// Open a note by id, creating it under that id if it does not exist
    Open { id: NoteId },
    /// Change fields of a note
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long, value_enum)]
        color: Option<Color>,
    },
    /// Delete notes
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Copy a note
    Duplicate { id: String },
    /// Pin or unpin a note
    Pin { id: String },
    /// Add a tag to notes, or remove it from them
    Tag {
        tag: String,
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(short, long)]
        remove: bool,
    },
    /// Move notes into a folder
    Move {
        folder: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Set a reminder as `YYYY-MM-DD HH:MM`, or clear it when no time is given
    Remind {
        id: String,
        at: Option<String>,
        #[arg(short, long, value_enum)]
        repeat: Option<Recurrence>,
    },
    /// Lock an unlocked note or unlock a locked one
    Lock { id: String },
    /// Remove a voice note by its position
    Unvoice { id: String, index: usize },
}

pub fn handle(workspace: &Workspace, cmd: &Command) -> Result<ExitCode> {
    let mut board = workspace.open_board()?;

    match cmd {
        Command::New {
            template,
            title,
            content,
        } => {
            let repo = board.repo_mut();
            let mut note = repo.create(*template)?;
            if let Some(delta) = field_delta(title.as_deref(), content.as_deref(), None) {
                note = repo.update(note.id(), delta)?.unwrap_or(note);
            }
            terminal::print_note(&note);
        }
        Command::List {
            search,
            pinned,
            sort,
        } => {
            let repo = board.repo();
            let notes = repo.notes();
            let visible = query::sort(
                query::filter(notes, search.as_deref().unwrap_or_default(), *pinned),
                *sort,
            );
            for note in &visible {
                terminal::print_row(note);
            }
            println!("{}", query::summarize(notes, visible.len(), repo.now()));
        }
        Command::Show { id } => {
            let Some(id) = resolve(&board, id) else {
                return Ok(not_found(id));
            };
            let guard = workspace.lock_guard()?;
            if let Some(note) = guard.reveal(board.repo(), &id, &mut StdinPrompt)? {
                terminal::print_note(&note);
            }
        }
        Command::Open { id } => match workspace.open_note(id)? {
            Some(window) => {
                if let Some(note) = window.note() {
                    terminal::print_note(note);
                }
            }
            None => return Ok(ExitCode::Usage),
        },
        Command::Edit {
            id,
            title,
            content,
            color,
        } => {
            let Some(id) = resolve(&board, id) else {
                return Ok(not_found(id));
            };
            if board.repo().get(&id).is_some_and(Note::locked) {
                eprintln!("Note {id} is locked, unlock it first");
                return Ok(ExitCode::NoPerm);
            }
            let Some(delta) = field_delta(title.as_deref(), content.as_deref(), *color) else {
                println!("Nothing to change");
                return Ok(ExitCode::Ok);
            };
            if let Some(note) = board.repo_mut().update(&id, delta)? {
                terminal::print_note(&note);
            }
        }
        Command::Delete { ids } => {
            let Some(ids) = resolve_all(&board, ids) else {
                return Ok(ExitCode::NoInput);
            };
            let removed = board.repo_mut().delete_many(&ids)?;
            println!("Deleted {removed} notes");
        }
        Command::Duplicate { id } => {
            let Some(id) = resolve(&board, id) else {
                return Ok(not_found(id));
            };
            if let Some(copy) = board.repo_mut().duplicate(&id)? {
                terminal::print_note(&copy);
            }
        }
        Command::Pin { id } => {
            let Some(id) = resolve(&board, id) else {
                return Ok(not_found(id));
            };
            if let Some(note) = board.repo_mut().toggle_pin(&id)? {
                terminal::print_row(&note);
            }
        }
        Command::Tag { tag, ids, remove } => {
            let Some(ids) = resolve_all(&board, ids) else {
                return Ok(ExitCode::NoInput);
            };
            let repo = board.repo_mut();
            if *remove {
                for id in &ids {
                    repo.remove_tag(id, tag)?;
                }
            } else {
                let changed = repo.tag_many(&ids, tag)?;
                println!("Tagged {changed} notes");
            }
        }
        Command::Move { folder, ids } => {
            let Some(ids) = resolve_all(&board, ids) else {
                return Ok(ExitCode::NoInput);
            };
            let moved = board.repo_mut().move_many(&ids, folder)?;
            println!("Moved {moved} notes to {folder}");
        }
        Command::Remind { id, at, repeat } => {
            let Some(id) = resolve(&board, id) else {
                return Ok(not_found(id));
            };
            let at = at.as_deref().unwrap_or_default();
            if let Some(note) = board.repo_mut().set_reminder(&id, at, *repeat)? {
                terminal::print_note(&note);
            }
        }
        Command::Lock { id } => {
            let Some(id) = resolve(&board, id) else {
                return Ok(not_found(id));
            };
            let guard = workspace.lock_guard()?;
            match guard.toggle(board.repo_mut(), &id, &mut StdinPrompt)? {
                LockOutcome::Locked => println!("Locked {id}"),
                LockOutcome::Unlocked => println!("Unlocked {id}"),
                LockOutcome::Canceled => println!("Nothing changed"),
            }
        }
        Command::Unvoice { id, index } => {
            let Some(id) = resolve(&board, id) else {
                return Ok(not_found(id));
            };
            // Shown 1-based
            let index = index.saturating_sub(1);
            if let Some(note) = board.repo_mut().remove_voice_note(&id, index)? {
                terminal::print_note(&note);
            }
        }
    }

    Ok(ExitCode::Ok)
}

/// Find a note by its id or an unambiguous prefix of it.
fn resolve(board: &Window, input: &str) -> Option<NoteId> {
    let notes = board.repo().notes();
    if let Some(note) = notes.iter().find(|n| n.id().as_str() == input) {
        return Some(note.id().clone());
    }

    let mut candidates = notes.iter().filter(|n| n.id().starts_with(input));
    match (candidates.next(), candidates.next()) {
        (Some(note), None) if !input.is_empty() => Some(note.id().clone()),
        _ => None,
    }
}

/// Resolve every input, reporting each one that matches no single note. `None` if any failed, so
/// bulk commands touch nothing on a typo.
fn resolve_all(board: &Window, inputs: &[String]) -> Option<Vec<NoteId>> {
    let resolved: Vec<Option<NoteId>> = inputs
        .iter()
        .map(|input| {
            let id = resolve(board, input);
            if id.is_none() {
                not_found(input);
            }
            id
        })
        .collect();

    resolved.into_iter().collect()
}

/// The delta for the field flags given on the command line, `None` when there are none.
fn field_delta(
    title: Option<&str>,
    content: Option<&str>,
    color: Option<Color>,
) -> Option<NoteDelta> {
    let mut delta = NoteDelta::new();
    if let Some(title) = title {
        delta = delta.title(title);
    }
    if let Some(content) = content {
        delta = delta.content(content);
    }
    if let Some(color) = color {
        delta = delta.color(color);
    }

    (delta != NoteDelta::new()).then_some(delta)
}

fn not_found(input: &str) -> ExitCode {
    eprintln!("No single note matches {input:?}");
    ExitCode::NoInput
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use sticky_lib::{
        repository::{Color, NoteDelta, Template, config::CoreConfig, store::DbStore},
        window::Workspace,
    };
    use sysexits::ExitCode;

    use super::{Command, field_delta, handle};
    use crate::terminal::TerminalSink;

    fn workspace() -> Workspace {
        Workspace::new(
            CoreConfig::default().into_handle(),
            Arc::new(DbStore::in_memory().unwrap()),
            Arc::new(TerminalSink),
        )
    }

    #[test]
    fn test_field_delta() {
        assert_eq!(field_delta(None, None, None), None);
        assert_eq!(
            field_delta(Some(""), None, Some(Color::Sky)),
            Some(NoteDelta::new().title("").color(Color::Sky))
        );
    }

    #[test]
    fn test_bulk_commands_with_unknown_id_fail_and_change_nothing() {
        let workspace = workspace();
        let mut board = workspace.open_board().unwrap();
        let note = board.repo_mut().create(Template::Blank).unwrap();
        let known = note.id().to_string();

        let delete = Command::Delete {
            ids: vec![known.clone(), "missing".into()],
        };
        assert_eq!(handle(&workspace, &delete).unwrap(), ExitCode::NoInput);

        let tag = Command::Tag {
            tag: "work".into(),
            ids: vec![known.clone(), "missing".into()],
            remove: false,
        };
        assert_eq!(handle(&workspace, &tag).unwrap(), ExitCode::NoInput);

        let moved = Command::Move {
            folder: "archive".into(),
            ids: vec!["missing".into()],
        };
        assert_eq!(handle(&workspace, &moved).unwrap(), ExitCode::NoInput);

        board.repo_mut().refresh_from_store().unwrap();
        assert_eq!(board.repo().notes(), &[note]);

        let delete = Command::Delete { ids: vec![known] };
        assert_eq!(handle(&workspace, &delete).unwrap(), ExitCode::Ok);
        board.repo_mut().refresh_from_store().unwrap();
        assert!(board.repo().notes().is_empty());
    }

    #[test]
    fn test_edit_without_fields_leaves_note_untouched() {
        let workspace = workspace();
        let mut board = workspace.open_board().unwrap();
        let note = board.repo_mut().create(Template::Blank).unwrap();

        let edit = Command::Edit {
            id: note.id().to_string(),
            title: None,
            content: None,
            color: None,
        };
        assert_eq!(handle(&workspace, &edit).unwrap(), ExitCode::Ok);
        board.repo_mut().refresh_from_store().unwrap();
        assert_eq!(board.repo().get(note.id()), Some(&note));

        let edit = Command::Edit {
            id: note.id().to_string(),
            title: Some("Renamed".into()),
            content: None,
            color: None,
        };
        assert_eq!(handle(&workspace, &edit).unwrap(), ExitCode::Ok);
        board.repo_mut().refresh_from_store().unwrap();
        let edited = board.repo().get(note.id()).unwrap();
        assert_eq!(edited.title, "Renamed");
        assert!(edited.updated_at() > note.updated_at());
    }
}
