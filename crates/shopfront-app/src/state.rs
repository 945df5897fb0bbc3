// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ScreenKind, ViewType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub screen: ScreenKind,
    /// Listing to return to when the cart closes.
    pub last_listing: ScreenKind,
    pub view_type: ViewType,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            screen: ScreenKind::Category,
            last_listing: ScreenKind::Category,
            view_type: ViewType::Grid,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextListing,
    OpenCart,
    CloseCart,
    ToggleViewType,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ScreenChanged(ScreenKind),
    ViewTypeChanged(ViewType),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextListing => {
                let listings = ScreenKind::LISTINGS;
                let current = listings
                    .iter()
                    .position(|screen| *screen == self.last_listing)
                    .unwrap_or(0);
                let next = listings[(current + 1) % listings.len()];
                self.last_listing = next;
                self.screen = next;
                vec![AppEvent::ScreenChanged(next)]
            }
            AppCommand::OpenCart => {
                if self.screen != ScreenKind::Cart {
                    self.last_listing = self.screen;
                }
                self.screen = ScreenKind::Cart;
                vec![AppEvent::ScreenChanged(self.screen)]
            }
            AppCommand::CloseCart => {
                self.screen = self.last_listing;
                vec![AppEvent::ScreenChanged(self.screen)]
            }
            AppCommand::ToggleViewType => {
                self.view_type = self.view_type.toggled();
                vec![
                    AppEvent::ViewTypeChanged(self.view_type),
                    self.set_status(&format!("{} view", self.view_type.as_str())),
                ]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    pub fn is_listing(&self) -> bool {
        self.screen != ScreenKind::Cart
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
