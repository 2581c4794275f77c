//! Chart kinds, the columns each role may bind to, and validation of a role selection.

use crate::classify::ColumnClasses;
use crate::error::RenderError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Scatter,
    Box,
    Histogram,
}

impl ChartKind {
    pub const ALL: [Self; 5] = [
        Self::Bar,
        Self::Line,
        Self::Scatter,
        Self::Box,
        Self::Histogram,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Scatter => "scatter",
            Self::Box => "box",
            Self::Histogram => "histogram",
        }
    }

    /// Name shown in the chart type selector.
    pub fn label(self) -> &'static str {
        match self {
            Self::Bar => "Bar Chart",
            Self::Line => "Line Chart",
            Self::Scatter => "Scatter Plot",
            Self::Box => "Box Plot",
            Self::Histogram => "Histogram",
        }
    }

    /// Legal columns per role for this kind, given the current table's classes.
    pub fn role_domains(self, classes: &ColumnClasses, all_columns: &[String]) -> RoleDomains {
        let numeric = || classes.numeric.clone();
        let categorical = || classes.categorical.clone();
        match self {
            Self::Bar | Self::Line => RoleDomains {
                x: Some(RoleDomain::required("X-axis", all_columns.to_vec())),
                y: Some(RoleDomain::required("Y-axis", numeric())),
                color: Some(RoleDomain::optional("Color by", categorical())),
            },
            Self::Scatter => RoleDomains {
                x: Some(RoleDomain::required("X-axis", numeric())),
                y: Some(RoleDomain::required("Y-axis", numeric())),
                color: Some(RoleDomain::optional("Color by", categorical())),
            },
            Self::Box => RoleDomains {
                x: Some(RoleDomain::optional("Group by", categorical())),
                y: Some(RoleDomain::required("Values", numeric())),
                color: None,
            },
            Self::Histogram => RoleDomains {
                x: Some(RoleDomain::required("Column", numeric())),
                y: None,
                color: Some(RoleDomain::optional("Color by", categorical())),
            },
        }
    }
}

/// A chart parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    X,
    Y,
    Color,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Color => "color",
        }
    }
}

/// Columns a role may bind to, and whether it must be bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDomain {
    /// Selector label
    pub label: &'static str,
    pub columns: Vec<String>,
    pub required: bool,
}

impl RoleDomain {
    fn required(label: &'static str, columns: Vec<String>) -> Self {
        Self {
            label,
            columns,
            required: true,
        }
    }

    fn optional(label: &'static str, columns: Vec<String>) -> Self {
        Self {
            label,
            columns,
            required: false,
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// Role domains of one chart kind. `None` means the kind does not take that role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDomains {
    pub x: Option<RoleDomain>,
    pub y: Option<RoleDomain>,
    pub color: Option<RoleDomain>,
}

impl RoleDomains {
    pub fn get(&self, role: Role) -> Option<&RoleDomain> {
        match role {
            Role::X => self.x.as_ref(),
            Role::Y => self.y.as_ref(),
            Role::Color => self.color.as_ref(),
        }
    }
}

/// Columns picked by the user for each role, not yet checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSelection {
    pub x: Option<String>,
    pub y: Option<String>,
    pub color: Option<String>,
}

impl RoleSelection {
    fn get(&self, role: Role) -> Option<&str> {
        match role {
            Role::X => self.x.as_deref(),
            Role::Y => self.y.as_deref(),
            Role::Color => self.color.as_deref(),
        }
    }

    /// Check every role against its domain and produce a drawable spec.
    pub fn validate(&self, kind: ChartKind, domains: &RoleDomains) -> Result<ChartSpec, RenderError> {
        let k = kind.as_str();
        for role in [Role::X, Role::Y, Role::Color] {
            let selected = self.get(role);
            match (domains.get(role), selected) {
                (None, Some(_)) => {
                    return Err(RenderError::UnsupportedRole {
                        kind: k,
                        role: role.as_str(),
                    })
                }
                (None, None) => {}
                (Some(domain), None) if domain.required => {
                    return Err(RenderError::MissingRole {
                        kind: k,
                        role: role.as_str(),
                    })
                }
                (Some(_), None) => {}
                (Some(domain), Some(column)) if !domain.contains(column) => {
                    return Err(RenderError::InvalidColumn {
                        kind: k,
                        role: role.as_str(),
                        column: column.to_string(),
                    })
                }
                (Some(_), Some(_)) => {}
            }
        }

        Ok(ChartSpec {
            kind,
            x: self.x.clone(),
            y: self.y.clone(),
            color: self.color.clone(),
        })
    }
}

/// First legal column for each required role; optional roles start unset.
pub fn default_selection(domains: &RoleDomains) -> RoleSelection {
    let pick = |domain: &Option<RoleDomain>| {
        domain
            .as_ref()
            .filter(|d| d.required)
            .and_then(|d| d.columns.first().cloned())
    };
    RoleSelection {
        x: pick(&domains.x),
        y: pick(&domains.y),
        color: pick(&domains.color),
    }
}

/// A validated chart: every bound column is legal for its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub x: Option<String>,
    pub y: Option<String>,
    pub color: Option<String>,
}

impl ChartSpec {
    pub fn title(&self) -> String {
        match (self.kind, self.x.as_deref(), self.y.as_deref()) {
            (ChartKind::Histogram, Some(x), _) => format!("Distribution of {}", x),
            (ChartKind::Box, None, Some(y)) => y.to_string(),
            (ChartKind::Box, Some(x), Some(y)) => format!("{} by {}", y, x),
            (_, Some(x), Some(y)) => format!("{} vs {}", y, x),
            _ => self.kind.label().to_string(),
        }
    }
}
