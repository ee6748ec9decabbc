//! Right-click popup menu.
//!
//! The menu content depends on what is under the pointer: the link entries only
//! appear over a URL match, and "Clear background" only when a background image is
//! set. The host shows the menu and reports the chosen [`MenuAction`].

use crate::config::CursorShape;

/// Actions that can be triggered from the popup menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Open the matched URL in a browser
    OpenLink,
    /// Put the matched URL on the clipboard
    CopyLink,
    Copy,
    Paste,
    SelectFont,
    SelectColors,
    SelectBackground,
    ClearBackground,
    SetOpacity,
    SetTitle,
    SetCursor(CursorShape),
}

/// A single item in the popup menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub action: MenuAction,
    /// Radio items show whether they are the current choice
    pub checked: Option<bool>,
}

impl MenuItem {
    pub const fn new(label: &'static str, action: MenuAction) -> Self {
        Self {
            label,
            action,
            checked: None,
        }
    }

    const fn radio(label: &'static str, action: MenuAction, checked: bool) -> Self {
        Self {
            label,
            action,
            checked: Some(checked),
        }
    }
}

/// Popup menu state for one right-click
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupMenu {
    /// A URL match is under the pointer
    pub show_link_items: bool,
    /// A background image is set
    pub show_clear_background: bool,
    pub cursor: CursorShape,
}

impl PopupMenu {
    pub fn new(show_link_items: bool, show_clear_background: bool, cursor: CursorShape) -> Self {
        Self {
            show_link_items,
            show_clear_background,
            cursor,
        }
    }

    /// Items in display order
    pub fn items(&self) -> Vec<MenuItem> {
        let mut items = Vec::with_capacity(14);

        if self.show_link_items {
            items.push(MenuItem::new("Open link...", MenuAction::OpenLink));
            items.push(MenuItem::new("Copy link...", MenuAction::CopyLink));
        }

        items.extend([
            MenuItem::new("Copy", MenuAction::Copy),
            MenuItem::new("Paste", MenuAction::Paste),
            MenuItem::new("Select font...", MenuAction::SelectFont),
            MenuItem::new("Select colors...", MenuAction::SelectColors),
            MenuItem::new("Select background...", MenuAction::SelectBackground),
        ]);

        if self.show_clear_background {
            items.push(MenuItem::new("Clear background", MenuAction::ClearBackground));
        }

        items.extend([
            MenuItem::new("Set opacity level...", MenuAction::SetOpacity),
            MenuItem::new("Set window title...", MenuAction::SetTitle),
        ]);

        for (label, shape) in [
            ("Block", CursorShape::Block),
            ("Underline", CursorShape::Underline),
            ("IBeam", CursorShape::IBeam),
        ] {
            items.push(MenuItem::radio(label, MenuAction::SetCursor(shape), shape == self.cursor));
        }

        items
    }

    /// Whether `action` is offered by this menu
    #[allow(dead_code)]
    pub fn offers(&self, action: MenuAction) -> bool {
        self.items().iter().any(|item| item.action == action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_items_only_over_match() {
        let without = PopupMenu::new(false, false, CursorShape::Block);
        assert!(!without.offers(MenuAction::OpenLink));
        assert!(!without.offers(MenuAction::CopyLink));
        assert_eq!(without.items()[0].action, MenuAction::Copy);

        let with = PopupMenu::new(true, false, CursorShape::Block);
        assert_eq!(with.items()[0].action, MenuAction::OpenLink);
        assert_eq!(with.items()[1].action, MenuAction::CopyLink);
    }

    #[test]
    fn test_clear_background_only_when_set() {
        let without = PopupMenu::new(false, false, CursorShape::Block);
        let with = PopupMenu::new(false, true, CursorShape::Block);
        assert!(!without.offers(MenuAction::ClearBackground));
        assert!(with.offers(MenuAction::ClearBackground));
    }

    #[test]
    fn test_current_cursor_is_checked() {
        let menu = PopupMenu::new(false, false, CursorShape::Underline);
        let checked: Vec<_> = menu
            .items()
            .into_iter()
            .filter(|item| item.checked == Some(true))
            .map(|item| item.action)
            .collect();
        assert_eq!(checked, [MenuAction::SetCursor(CursorShape::Underline)]);
    }
}
