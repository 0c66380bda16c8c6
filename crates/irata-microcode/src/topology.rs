//! Hardware topology: the set of addressable control lines on the target CPU.
//!
//! Control names are written as dotted relative paths (`pc.increment`) or absolute paths
//! (`/cpu/pc/increment`); both normalize to the absolute form. Each control gets a
//! [`ControlId`], its index in the path-sorted control table.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MicrocodeError;

/// Root every relative control path is placed under.
pub const CPU_ROOT: &str = "/cpu/";

/// Phase of the clock tick in which a control is acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickPhase {
    Control,
    Write,
    Read,
    Process,
}

impl fmt::Display for TickPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TickPhase::Control => "control",
            TickPhase::Write => "write",
            TickPhase::Read => "read",
            TickPhase::Process => "process",
        };
        f.write_str(name)
    }
}

/// Hardware description document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HardwareDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub controls: Vec<ControlDecl>,
}

/// A control declaration: a bare path, or a path with metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlDecl {
    Path(String),
    Detailed(DetailedControlDecl),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetailedControlDecl {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<TickPhase>,
    #[serde(default)]
    pub auto_reset: bool,
}

impl ControlDecl {
    pub fn path(&self) -> &str {
        match self {
            ControlDecl::Path(path) => path,
            ControlDecl::Detailed(detail) => &detail.path,
        }
    }
}

/// Canonical handle of a control line within one [`HardwareTopology`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControlId(u32);

impl ControlId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A resolved control line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlLine {
    /// Normalized absolute path.
    pub path: String,
    pub phase: Option<TickPhase>,
    pub auto_reset: bool,
}

/// Lookup of symbolic control names. Implementations never mutate on lookup.
pub trait ControlLookup {
    /// Resolve a control name to its handle.
    fn resolve(&self, name: &str) -> Option<ControlId>;

    /// The control line behind a handle.
    fn control(&self, id: ControlId) -> &ControlLine;
}

/// Immutable index of the target CPU's control lines.
#[derive(Debug, Clone, Default)]
pub struct HardwareTopology {
    name: Option<String>,
    controls: Vec<ControlLine>,
    by_path: HashMap<String, ControlId>,
}

impl HardwareTopology {
    /// Build the topology, rejecting empty and duplicate paths.
    pub fn from_document(document: &HardwareDocument) -> Result<Self, Vec<MicrocodeError>> {
        let mut errors = Vec::new();
        let mut lines: Vec<(usize, ControlLine)> = Vec::with_capacity(document.controls.len());

        for (index, decl) in document.controls.iter().enumerate() {
            let path = normalize_path(decl.path());
            if path.is_empty() {
                errors.push(MicrocodeError::schema(
                    format!("controls[{index}].path"),
                    "control path is empty",
                ));
                continue;
            }
            let (phase, auto_reset) = match decl {
                ControlDecl::Path(_) => (None, false),
                ControlDecl::Detailed(detail) => (detail.phase, detail.auto_reset),
            };
            lines.push((
                index,
                ControlLine {
                    path,
                    phase,
                    auto_reset,
                },
            ));
        }

        lines.sort_by(|a, b| a.1.path.cmp(&b.1.path).then(a.0.cmp(&b.0)));
        let mut topology = HardwareTopology {
            name: document.name.clone(),
            ..Self::default()
        };
        for (index, line) in lines {
            if topology.by_path.contains_key(&line.path) {
                errors.push(MicrocodeError::DuplicateControlPath {
                    path: line.path,
                    index,
                });
                continue;
            }
            let id = ControlId(topology.controls.len() as u32);
            topology.by_path.insert(line.path.clone(), id);
            topology.controls.push(line);
        }

        if errors.is_empty() {
            Ok(topology)
        } else {
            Err(errors)
        }
    }

    /// Build a topology from bare control names.
    pub fn from_paths<I, S>(paths: I) -> Result<Self, Vec<MicrocodeError>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_document(&HardwareDocument {
            name: None,
            controls: paths
                .into_iter()
                .map(|p| ControlDecl::Path(p.into()))
                .collect(),
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Controls sorted by path; position equals [`ControlId::index`].
    pub fn controls(&self) -> &[ControlLine] {
        &self.controls
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

impl ControlLookup for HardwareTopology {
    fn resolve(&self, name: &str) -> Option<ControlId> {
        let path = normalize_path(name);
        if path.is_empty() {
            return None;
        }
        self.by_path.get(&path).copied()
    }

    fn control(&self, id: ControlId) -> &ControlLine {
        &self.controls[id.index()]
    }
}

/// Normalize a control name to its absolute path.
///
/// Absolute names (leading `/`) are returned unchanged; relative names are placed under
/// [`CPU_ROOT`] with `.` separators turned into `/`. Blank input yields an empty string.
pub fn normalize_path(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return String::new();
    }
    if name.starts_with('/') {
        return name.to_string();
    }
    let mut normalized = String::with_capacity(CPU_ROOT.len() + name.len());
    normalized.push_str(CPU_ROOT);
    normalized.extend(name.chars().map(|c| if c == '.' { '/' } else { c }));
    normalized
}
