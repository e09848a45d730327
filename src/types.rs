//! Shared types used across the codebase
//!
//! Status columns are stored as TEXT; these enums are the typed view of them.
//! Rows decode through `TryFrom<String>` and queries bind `as_str()`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}'")]
pub struct StatusParseError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = StatusParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(StatusParseError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = StatusParseError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

text_enum! {
    /// Kanban column of a task
    TaskStatus, "task status" {
        Todo => "todo",
        Doing => "doing",
        Done => "done",
    }
}

text_enum! {
    /// Lifecycle of a project. Labels are the ones the frontend displays.
    ProjectStatus, "project status" {
        Proposal => "Proposta",
        Planning => "Planejamento",
        InProgress => "Em Andamento",
        Completed => "Concluído",
        Invoiced => "Faturado",
    }
}

text_enum! {
    InvoiceStatus, "invoice status" {
        Pending => "pending",
        Paid => "paid",
        Canceled => "canceled",
    }
}

text_enum! {
    BillingType, "billing type" {
        Hourly => "hourly",
        Fixed => "fixed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_labels() {
        assert_eq!("doing".parse::<TaskStatus>(), Ok(TaskStatus::Doing));
        assert_eq!("Em Andamento".parse::<ProjectStatus>(), Ok(ProjectStatus::InProgress));
        assert_eq!("Concluído".parse::<ProjectStatus>(), Ok(ProjectStatus::Completed));
        assert_eq!(InvoiceStatus::try_from("canceled".to_string()), Ok(InvoiceStatus::Canceled));
    }

    #[test]
    fn rejects_unknown_labels() {
        let err = "archived".parse::<TaskStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid task status 'archived'");
        assert!("em andamento".parse::<ProjectStatus>().is_err());
    }

    #[test]
    fn serializes_as_label() {
        let json = serde_json::to_string(&ProjectStatus::Invoiced).unwrap();
        assert_eq!(json, "\"Faturado\"");
        let back: BillingType = serde_json::from_str("\"fixed\"").unwrap();
        assert_eq!(back, BillingType::Fixed);
    }
}
