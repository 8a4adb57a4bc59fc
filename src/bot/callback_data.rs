//! Typed encoding for inline-keyboard callback payloads.
//!
//! Telegram limits callback data to 64 bytes, so actions are packed into
//! compact `prefix:field:...` strings and parsed back into a typed enum
//! before dispatch.

/// Every callback action a keyboard can emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    MainMenu,
    Profile,
    SettingsMenu,
    SettingsTimezone,
    SettingsReminderTime,
    SetTimezone(String),
    ManualTimezone,
    /// Value is `HH:MM`
    SetReminderTime(String),
    ManualReminderTime,
    NotesPage {
        page: i64,
        archived: bool,
    },
    NoteView {
        note_id: i32,
        page: i64,
        archived: bool,
    },
    NoteArchive {
        note_id: i32,
        page: i64,
    },
    NoteUnarchive {
        note_id: i32,
        page: i64,
    },
    NoteComplete {
        note_id: i32,
        page: i64,
    },
    NoteConfirmDelete {
        note_id: i32,
        page: i64,
        archived: bool,
    },
    NoteDelete {
        note_id: i32,
        page: i64,
        archived: bool,
    },
    NoteEdit {
        note_id: i32,
        page: i64,
    },
    NoteUndoCreate {
        note_id: i32,
    },
    NoteStopRecurrence {
        note_id: i32,
        page: i64,
    },
    NoteListenAudio {
        note_id: i32,
    },
    NoteSnooze {
        note_id: i32,
        minutes: i64,
    },
    BirthdaysPage {
        page: i64,
    },
    BirthdayAdd,
    BirthdayImport,
    BirthdayDelete {
        id: i32,
        page: i64,
    },
}

fn flag(archived: bool) -> &'static str {
    if archived {
        "1"
    } else {
        "0"
    }
}

impl Callback {
    /// Pack into the wire string placed in `callback_data`.
    pub fn encode(&self) -> String {
        match self {
            Callback::MainMenu => "menu".to_string(),
            Callback::Profile => "profile".to_string(),
            Callback::SettingsMenu => "settings".to_string(),
            Callback::SettingsTimezone => "settings:tz".to_string(),
            Callback::SettingsReminderTime => "settings:rem".to_string(),
            Callback::SetTimezone(name) => format!("tz:set:{name}"),
            Callback::ManualTimezone => "tz:manual".to_string(),
            // ':' separates fields, so the time keeps a dash
            Callback::SetReminderTime(value) => format!("rem:set:{}", value.replace(':', "-")),
            Callback::ManualReminderTime => "rem:manual".to_string(),
            Callback::NotesPage { page, archived } => {
                format!("notes:page:{page}:{}", flag(*archived))
            }
            Callback::NoteView {
                note_id,
                page,
                archived,
            } => format!("note:view:{note_id}:{page}:{}", flag(*archived)),
            Callback::NoteArchive { note_id, page } => format!("note:arch:{note_id}:{page}"),
            Callback::NoteUnarchive { note_id, page } => format!("note:unarch:{note_id}:{page}"),
            Callback::NoteComplete { note_id, page } => format!("note:done:{note_id}:{page}"),
            Callback::NoteConfirmDelete {
                note_id,
                page,
                archived,
            } => format!("note:confdel:{note_id}:{page}:{}", flag(*archived)),
            Callback::NoteDelete {
                note_id,
                page,
                archived,
            } => format!("note:del:{note_id}:{page}:{}", flag(*archived)),
            Callback::NoteEdit { note_id, page } => format!("note:edit:{note_id}:{page}"),
            Callback::NoteUndoCreate { note_id } => format!("note:undo:{note_id}"),
            Callback::NoteStopRecurrence { note_id, page } => {
                format!("note:norec:{note_id}:{page}")
            }
            Callback::NoteListenAudio { note_id } => format!("note:audio:{note_id}"),
            Callback::NoteSnooze { note_id, minutes } => {
                format!("note:snooze:{note_id}:{minutes}")
            }
            Callback::BirthdaysPage { page } => format!("bday:page:{page}"),
            Callback::BirthdayAdd => "bday:add".to_string(),
            Callback::BirthdayImport => "bday:import".to_string(),
            Callback::BirthdayDelete { id, page } => format!("bday:del:{id}:{page}"),
        }
    }

    /// Parse a wire string; unknown or malformed payloads yield `None`.
    pub fn parse(data: &str) -> Option<Callback> {
        let parts: Vec<&str> = data.split(':').collect();
        let parsed = match parts.as_slice() {
            ["menu"] => Callback::MainMenu,
            ["profile"] => Callback::Profile,
            ["settings"] => Callback::SettingsMenu,
            ["settings", "tz"] => Callback::SettingsTimezone,
            ["settings", "rem"] => Callback::SettingsReminderTime,
            ["tz", "set", name] => Callback::SetTimezone((*name).to_string()),
            ["tz", "manual"] => Callback::ManualTimezone,
            ["rem", "set", value] => Callback::SetReminderTime(value.replace('-', ":")),
            ["rem", "manual"] => Callback::ManualReminderTime,
            ["notes", "page", page, archived] => Callback::NotesPage {
                page: page.parse().ok()?,
                archived: *archived == "1",
            },
            ["note", "view", id, page, archived] => Callback::NoteView {
                note_id: id.parse().ok()?,
                page: page.parse().ok()?,
                archived: *archived == "1",
            },
            ["note", "arch", id, page] => Callback::NoteArchive {
                note_id: id.parse().ok()?,
                page: page.parse().ok()?,
            },
            ["note", "unarch", id, page] => Callback::NoteUnarchive {
                note_id: id.parse().ok()?,
                page: page.parse().ok()?,
            },
            ["note", "done", id, page] => Callback::NoteComplete {
                note_id: id.parse().ok()?,
                page: page.parse().ok()?,
            },
            ["note", "confdel", id, page, archived] => Callback::NoteConfirmDelete {
                note_id: id.parse().ok()?,
                page: page.parse().ok()?,
                archived: *archived == "1",
            },
            ["note", "del", id, page, archived] => Callback::NoteDelete {
                note_id: id.parse().ok()?,
                page: page.parse().ok()?,
                archived: *archived == "1",
            },
            ["note", "edit", id, page] => Callback::NoteEdit {
                note_id: id.parse().ok()?,
                page: page.parse().ok()?,
            },
            ["note", "undo", id] => Callback::NoteUndoCreate {
                note_id: id.parse().ok()?,
            },
            ["note", "norec", id, page] => Callback::NoteStopRecurrence {
                note_id: id.parse().ok()?,
                page: page.parse().ok()?,
            },
            ["note", "audio", id] => Callback::NoteListenAudio {
                note_id: id.parse().ok()?,
            },
            ["note", "snooze", id, minutes] => Callback::NoteSnooze {
                note_id: id.parse().ok()?,
                minutes: minutes.parse().ok()?,
            },
            ["bday", "page", page] => Callback::BirthdaysPage {
                page: page.parse().ok()?,
            },
            ["bday", "add"] => Callback::BirthdayAdd,
            ["bday", "import"] => Callback::BirthdayImport,
            ["bday", "del", id, page] => Callback::BirthdayDelete {
                id: id.parse().ok()?,
                page: page.parse().ok()?,
            },
            _ => return None,
        };
        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_every_variant() {
        let actions = vec![
            Callback::MainMenu,
            Callback::Profile,
            Callback::SettingsMenu,
            Callback::SettingsTimezone,
            Callback::SettingsReminderTime,
            Callback::SetTimezone("Europe/Moscow".into()),
            Callback::ManualTimezone,
            Callback::SetReminderTime("09:30".into()),
            Callback::ManualReminderTime,
            Callback::NotesPage {
                page: 2,
                archived: true,
            },
            Callback::NoteView {
                note_id: 17,
                page: 3,
                archived: false,
            },
            Callback::NoteArchive {
                note_id: 17,
                page: 1,
            },
            Callback::NoteUnarchive {
                note_id: 17,
                page: 1,
            },
            Callback::NoteComplete {
                note_id: 17,
                page: 1,
            },
            Callback::NoteConfirmDelete {
                note_id: 17,
                page: 1,
                archived: true,
            },
            Callback::NoteDelete {
                note_id: 17,
                page: 1,
                archived: false,
            },
            Callback::NoteEdit {
                note_id: 17,
                page: 2,
            },
            Callback::NoteUndoCreate { note_id: 17 },
            Callback::NoteStopRecurrence {
                note_id: 17,
                page: 1,
            },
            Callback::NoteListenAudio { note_id: 17 },
            Callback::NoteSnooze {
                note_id: 17,
                minutes: 180,
            },
            Callback::BirthdaysPage { page: 4 },
            Callback::BirthdayAdd,
            Callback::BirthdayImport,
            Callback::BirthdayDelete { id: 5, page: 1 },
        ];
        for action in actions {
            let encoded = action.encode();
            assert!(
                encoded.len() <= 64,
                "{encoded} exceeds Telegram's 64-byte limit"
            );
            assert_eq!(Callback::parse(&encoded), Some(action), "{encoded}");
        }
    }

    #[test]
    fn timezone_names_survive_the_slash() {
        let encoded = Callback::SetTimezone("Asia/Yekaterinburg".into()).encode();
        assert_eq!(
            Callback::parse(&encoded),
            Some(Callback::SetTimezone("Asia/Yekaterinburg".into()))
        );
    }

    #[test]
    fn reminder_time_keeps_the_colon_form() {
        let encoded = Callback::SetReminderTime("09:00".into()).encode();
        assert!(!encoded[8..].contains(':'), "{encoded}");
        assert_eq!(
            Callback::parse(&encoded),
            Some(Callback::SetReminderTime("09:00".into()))
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(Callback::parse(""), None);
        assert_eq!(Callback::parse("unknown"), None);
        assert_eq!(Callback::parse("note:view:abc:1:0"), None);
        assert_eq!(Callback::parse("note:view:1"), None);
    }
}
