use serde::Serialize;

use super::window::Window;
use crate::annotation::JoinKey;
use crate::data::AccountState;

/// One of the four ranked "top offenders" tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportVariant {
    RecentClosed,
    AgedClosed,
    RecentOpen,
    AgedOpen,
}

impl ReportVariant {
    pub const ALL: [ReportVariant; 4] = [
        ReportVariant::RecentClosed,
        ReportVariant::AgedClosed,
        ReportVariant::RecentOpen,
        ReportVariant::AgedOpen,
    ];

    pub fn new(window: Window, state: AccountState) -> Self {
        match (window, state) {
            (Window::Recent, AccountState::Closed) => Self::RecentClosed,
            (Window::Aged, AccountState::Closed) => Self::AgedClosed,
            (Window::Recent, AccountState::Open) => Self::RecentOpen,
            (Window::Aged, AccountState::Open) => Self::AgedOpen,
        }
    }

    pub fn window(self) -> Window {
        match self {
            Self::RecentClosed | Self::RecentOpen => Window::Recent,
            Self::AgedClosed | Self::AgedOpen => Window::Aged,
        }
    }

    pub fn state(self) -> AccountState {
        match self {
            Self::RecentClosed | Self::AgedClosed => AccountState::Closed,
            Self::RecentOpen | Self::AgedOpen => AccountState::Open,
        }
    }

    /// Open-account notes are tied to the attendance month as well as the
    /// patient; closed-account notes follow the patient alone.
    pub fn join_key(self) -> JoinKey {
        match self.state() {
            AccountState::Closed => JoinKey::Patient,
            AccountState::Open => JoinKey::PatientAndDate,
        }
    }

    /// Annotation file name inside the annotations directory
    pub fn file_name(self) -> &'static str {
        match self {
            Self::RecentClosed => "top_15_inadimplentes_12_meses.csv",
            Self::AgedClosed => "top_15_inadimplentes_mais_de_12_meses.csv",
            Self::RecentOpen => "top_15_inadimplentes_12_meses_ca.csv",
            Self::AgedOpen => "top_15_inadimplentes_mais_de_12_meses_ca.csv",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Self::RecentClosed => "recent-closed",
            Self::AgedClosed => "aged-closed",
            Self::RecentOpen => "recent-open",
            Self::AgedOpen => "aged-open",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::RecentClosed => "Top offenders - closed accounts, last 12 months",
            Self::AgedClosed => "Top offenders - closed accounts, older than 12 months",
            Self::RecentOpen => "Top offenders - open accounts, last 12 months",
            Self::AgedOpen => "Top offenders - open accounts, older than 12 months",
        }
    }
}

impl std::fmt::Display for ReportVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}
