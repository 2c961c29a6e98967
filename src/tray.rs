use thiserror::Error;
use tray_icon::menu::{MenuEvent, MenuId};
use tray_icon::{
    menu::{Menu, MenuItem, PredefinedMenuItem, Submenu},
    TrayIcon, TrayIconBuilder,
};

use pet_core::{ExpressionImage, Pattern};

#[derive(Error, Debug)]
pub enum TrayError {
    #[error("Failed to build tray menu: {0}")]
    Menu(#[from] tray_icon::menu::Error),
    #[error("Failed to create tray icon image: {0}")]
    Icon(#[from] tray_icon::BadIcon),
    #[error("Failed to build tray icon: {0}")]
    Build(#[from] tray_icon::Error),
}

/// Menu item IDs for handling events
pub struct MenuIds {
    pub open_menu: MenuId,
    pub talking_a: MenuId,
    pub talking_b: MenuId,
    pub denying: MenuId,
    pub quit: MenuId,
}

pub struct TrayComponents {
    /// Keep tray icon alive (dropping it removes the icon)
    #[allow(dead_code)]
    pub tray_icon: TrayIcon,
    pub menu_ids: MenuIds,
}

/// Commands that can be sent from tray menu
#[derive(Debug, Clone, PartialEq)]
pub enum TrayCommand {
    OpenMenu,
    /// Play a demo line with the given pattern
    Play(Pattern),
    Quit,
}

pub fn setup_tray(icon: &ExpressionImage, tooltip: &str) -> Result<TrayComponents, TrayError> {
    let tray_menu = Menu::new();

    // 1. Submenu to try the expression patterns
    let play_submenu = Submenu::new("Play", true);
    let talking_a_item = MenuItem::new("Talking A", true, None);
    let talking_b_item = MenuItem::new("Talking B", true, None);
    let denying_item = MenuItem::new("Denying", true, None);

    let talking_a_id = talking_a_item.id().clone();
    let talking_b_id = talking_b_item.id().clone();
    let denying_id = denying_item.id().clone();

    play_submenu.append_items(&[&talking_a_item, &talking_b_item, &denying_item])?;

    // 2. Main menu items
    let open_menu_item = MenuItem::new("Function Menu", true, None);
    let quit_item = MenuItem::new("Quit", true, None);

    let open_menu_id = open_menu_item.id().clone();
    let quit_id = quit_item.id().clone();

    tray_menu.append_items(&[
        &open_menu_item,
        &PredefinedMenuItem::separator(),
        &play_submenu,
        &PredefinedMenuItem::separator(),
        &quit_item,
    ])?;

    // 3. The closed face doubles as the tray icon
    let icon = tray_icon::Icon::from_rgba(icon.as_raw().to_vec(), icon.width(), icon.height())?;

    let tray_icon = TrayIconBuilder::new()
        .with_menu(Box::new(tray_menu))
        .with_tooltip(tooltip)
        .with_icon(icon)
        .build()?;

    let menu_ids = MenuIds {
        open_menu: open_menu_id,
        talking_a: talking_a_id,
        talking_b: talking_b_id,
        denying: denying_id,
        quit: quit_id,
    };

    Ok(TrayComponents { tray_icon, menu_ids })
}

/// Check for menu events and return command if any
pub fn poll_menu_event(menu_ids: &MenuIds) -> Option<TrayCommand> {
    let event = MenuEvent::receiver().try_recv().ok()?;
    command_for(menu_ids, &event.id)
}

fn command_for(menu_ids: &MenuIds, id: &MenuId) -> Option<TrayCommand> {
    if *id == menu_ids.open_menu {
        Some(TrayCommand::OpenMenu)
    } else if *id == menu_ids.talking_a {
        Some(TrayCommand::Play(Pattern::TalkingA))
    } else if *id == menu_ids.talking_b {
        Some(TrayCommand::Play(Pattern::TalkingB))
    } else if *id == menu_ids.denying {
        Some(TrayCommand::Play(Pattern::Denying))
    } else if *id == menu_ids.quit {
        Some(TrayCommand::Quit)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_for_menu_ids() {
        let ids = MenuIds {
            open_menu: MenuId::new("open"),
            talking_a: MenuId::new("a"),
            talking_b: MenuId::new("b"),
            denying: MenuId::new("deny"),
            quit: MenuId::new("quit"),
        };
        assert_eq!(command_for(&ids, &MenuId::new("b")), Some(TrayCommand::Play(Pattern::TalkingB)));
        assert_eq!(command_for(&ids, &MenuId::new("quit")), Some(TrayCommand::Quit));
        assert_eq!(command_for(&ids, &MenuId::new("other")), None);
    }
}
