//! Application state snapshot and the view settings that drive projection.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{MovieId, MovieRecord, MovieView};

/// How the visible list is laid out. Has no effect on ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    #[default]
    List,
    Grid,
}

impl LayoutMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::List => Self::Grid,
            Self::Grid => Self::List,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Grid => "grid",
        }
    }
}

/// Sort key for the visible list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    #[default]
    Title,
    ReleaseDate,
    UserRating,
}

impl SortOption {
    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::ReleaseDate => "release date",
            Self::UserRating => "rating",
        }
    }
}

/// Which records survive projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOption {
    #[default]
    All,
    Liked,
}

impl FilterOption {
    pub fn toggled(self) -> Self {
        match self {
            Self::All => Self::Liked,
            Self::Liked => Self::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Liked => "liked",
        }
    }

    pub fn matches(self, view: &MovieView) -> bool {
        match self {
            Self::All => true,
            Self::Liked => view.liked,
        }
    }
}

impl FromStr for LayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" => Ok(Self::List),
            "grid" => Ok(Self::Grid),
            other => Err(format!("unknown layout '{}' (expected list or grid)", other)),
        }
    }
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "title" => Ok(Self::Title),
            "release_date" | "date" => Ok(Self::ReleaseDate),
            "user_rating" | "rating" => Ok(Self::UserRating),
            other => Err(format!(
                "unknown sort '{}' (expected title, release-date or rating)",
                other
            )),
        }
    }
}

impl FromStr for FilterOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "liked" => Ok(Self::Liked),
            other => Err(format!("unknown filter '{}' (expected all or liked)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub layout: LayoutMode,
    pub sort: SortOption,
    pub filter: FilterOption,
}

/// Loading lifecycle of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error(String),
}

impl LoadStatus {
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

/// The single application state snapshot owned by [`crate::StateStore`].
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Records from the last successful refresh, in page order.
    pub raw_catalog: Vec<MovieRecord>,
    pub liked_ids: BTreeSet<MovieId>,
    pub settings: Settings,
    pub selection: Option<MovieId>,
    pub status: LoadStatus,
    /// Output of the last projection.
    pub visible: Vec<MovieView>,
}

impl AppState {
    pub fn selected(&self) -> Option<&MovieView> {
        let id = self.selection?;
        self.visible.iter().find(|v| v.id() == id)
    }
}
