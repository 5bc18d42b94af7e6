//! Keyboard accelerators of the application window.

/// Command bound to a window accelerator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Primary+Q
    Quit,

    /// Primary+R: re-render the window from the current session snapshot
    Reload,

    /// Primary+Shift+I
    ToggleDiagnostics,
}

/// Modifier state of a key press
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub control: bool,
    pub meta: bool,
    pub shift: bool,
}

impl Modifiers {
    /// Whether the platform's primary modifier is held: Cmd on macOS, Ctrl elsewhere
    pub fn primary(&self) -> bool {
        if cfg!(target_os = "macos") {
            self.meta
        } else {
            self.control
        }
    }
}

impl AppCommand {
    /// Map a key press to a command. `key` is the text of the pressed key.
    pub fn from_key(key: &str, modifiers: Modifiers) -> Option<Self> {
        if !modifiers.primary() {
            return None;
        }

        let mut chars = key.chars();
        let key = chars.next()?.to_ascii_lowercase();
        if chars.next().is_some() {
            return None;
        }

        match (key, modifiers.shift) {
            ('q', false) => Some(AppCommand::Quit),
            ('r', false) => Some(AppCommand::Reload),
            ('i', true) => Some(AppCommand::ToggleDiagnostics),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary() -> Modifiers {
        if cfg!(target_os = "macos") {
            Modifiers {
                meta: true,
                ..Modifiers::default()
            }
        } else {
            Modifiers {
                control: true,
                ..Modifiers::default()
            }
        }
    }

    #[test]
    fn test_primary_bindings() {
        assert_eq!(AppCommand::from_key("q", primary()), Some(AppCommand::Quit));
        assert_eq!(AppCommand::from_key("r", primary()), Some(AppCommand::Reload));

        let shifted = Modifiers {
            shift: true,
            ..primary()
        };
        assert_eq!(
            AppCommand::from_key("I", shifted),
            Some(AppCommand::ToggleDiagnostics)
        );
    }

    #[test]
    fn test_requires_primary_modifier() {
        assert_eq!(AppCommand::from_key("q", Modifiers::default()), None);

        let shift_only = Modifiers {
            shift: true,
            ..Modifiers::default()
        };
        assert_eq!(AppCommand::from_key("I", shift_only), None);
    }

    #[test]
    fn test_unbound_keys() {
        assert_eq!(AppCommand::from_key("i", primary()), None);
        assert_eq!(AppCommand::from_key("x", primary()), None);
        assert_eq!(AppCommand::from_key("", primary()), None);
        assert_eq!(AppCommand::from_key("qq", primary()), None);
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_meta_is_not_primary_off_macos() {
        let meta = Modifiers {
            meta: true,
            ..Modifiers::default()
        };
        assert_eq!(AppCommand::from_key("q", meta), None);
    }
}
