//! Custom channel ids → canonical 60-electrode layout.
//!
//! A recording arrives as `R` raw rows, each labelled by a custom channel id
//! in `channel_info` (`0` = unused).  [`ElectrodeMapping`] resolves an id to
//! its canonical index and [`ChannelMapper`] scatters the raw rows into a
//! fixed `[60, T]` buffer:
//!
//! ```text
//! canonical[mapping[channel_info[i]]] = raw[i]
//! ```
//!
//! Ids that are `0`, absent from the mapping, or that resolve outside
//! `[0, 60)` leave their canonical row zero-filled and are listed in the
//! returned [`MappingReport`].  Two raw rows resolving to the same canonical
//! index abort with [`MeaError::DuplicateCanonicalIndex`].
use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use ndarray::Array2;
use serde::Deserialize;

use crate::error::{MeaError, Result};
use crate::N_CHANNELS;

// ── Electrode mapping ─────────────────────────────────────────────────────────

/// Read-only lookup from custom channel id to canonical electrode index.
///
/// Values are stored as read (`i64`) so that out-of-range targets can be
/// reported instead of rejected at load time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElectrodeMapping {
    table: HashMap<u32, i64>,
}

/// On-disk forms accepted by [`ElectrodeMapping::from_json_str`].
#[derive(Deserialize)]
#[serde(untagged)]
enum MappingDocument {
    Wrapped { amplifier_channel_map: BTreeMap<String, i64> },
    Flat(BTreeMap<String, i64>),
}

impl ElectrodeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, returning the previous target.
    pub fn insert(&mut self, id: u32, index: i64) -> Option<i64> {
        self.table.insert(id, index)
    }

    /// Parse a JSON mapping table.
    ///
    /// Both the flat form `{"5": 10, "12": 20}` and the wrapped form
    /// `{"amplifier_channel_map": {"5": 10}}` are accepted.  Keys must be
    /// stringified non-negative integers.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: MappingDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    /// Like [`from_json_str`](Self::from_json_str) but reads from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let doc: MappingDocument = serde_json::from_reader(reader)?;
        Self::from_document(doc)
    }

    fn from_document(doc: MappingDocument) -> Result<Self> {
        let raw = match doc {
            MappingDocument::Wrapped { amplifier_channel_map } => amplifier_channel_map,
            MappingDocument::Flat(m) => m,
        };
        let mut table = HashMap::with_capacity(raw.len());
        for (key, index) in raw {
            let id: u32 = key
                .trim()
                .parse()
                .map_err(|_| MeaError::Config(format!("channel id '{key}' is not an integer")))?;
            table.insert(id, index);
        }
        Ok(Self { table })
    }

    /// Build a mapping from the custom channel names reported by an
    /// amplifier, in acquisition order: name `k` at position `i` maps to `i`.
    pub fn from_amplifier_channel_names(names: &[u32]) -> Self {
        names
            .iter()
            .enumerate()
            .map(|(i, &name)| (name, i as i64))
            .collect()
    }

    /// Canonical target for `id`, or `None` on a miss.
    pub fn get(&self, id: u32) -> Option<i64> {
        self.table.get(&id).copied()
    }

    /// Classify a `channel_info` entry.
    pub fn resolve(&self, id: u32) -> Slot {
        if id == 0 {
            return Slot::Unused;
        }
        match self.get(id) {
            None => Slot::Unmapped(UnmappedReason::MissingId),
            Some(c) if (0..N_CHANNELS as i64).contains(&c) => Slot::Mapped(c as usize),
            Some(c) => Slot::Unmapped(UnmappedReason::OutOfRange(c)),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl FromIterator<(u32, i64)> for ElectrodeMapping {
    fn from_iter<I: IntoIterator<Item = (u32, i64)>>(iter: I) -> Self {
        Self { table: iter.into_iter().collect() }
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// Outcome of resolving one `channel_info` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Id `0`: the raw row carries no electrode.
    Unused,
    /// Canonical index in `[0, 60)`.
    Mapped(usize),
    Unmapped(UnmappedReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmappedReason {
    /// The id has no entry in the mapping.
    MissingId,
    /// The id maps outside `[0, 60)`.
    OutOfRange(i64),
}

/// A raw row that was dropped because its id could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnmappedChannel {
    pub raw_index: usize,
    pub id: u32,
    pub reason: UnmappedReason,
}

/// Resolved placement of every raw row, plus what was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingReport {
    /// `sources[c]` is the raw row feeding canonical row `c`, if any.
    pub sources: Vec<Option<usize>>,
    /// Raw rows whose id was `0`.
    pub unused: Vec<usize>,
    /// Raw rows with a non-zero id that could not be placed.
    pub unmapped: Vec<UnmappedChannel>,
    n_raw: usize,
}

impl MappingReport {
    /// Report for data that is already in canonical order.
    pub fn identity() -> Self {
        Self {
            sources: (0..N_CHANNELS).map(Some).collect(),
            unused: vec![],
            unmapped: vec![],
            n_raw: N_CHANNELS,
        }
    }

    /// Number of raw rows the report was planned for.
    pub fn n_raw(&self) -> usize {
        self.n_raw
    }

    pub fn n_mapped(&self) -> usize {
        self.sources.iter().filter(|s| s.is_some()).count()
    }

    pub fn n_unmapped(&self) -> usize {
        self.unmapped.len()
    }

    /// Canonical rows with no raw source (left zero / empty).
    pub fn empty_rows(&self) -> Vec<usize> {
        self.sources
            .iter()
            .enumerate()
            .filter_map(|(c, s)| s.is_none().then_some(c))
            .collect()
    }

    /// Scatter `raw` ([R, T]) into a zero-filled `[60, T]` buffer.
    pub fn canonical_signal(&self, raw: &Array2<f32>) -> Result<Array2<f32>> {
        if raw.nrows() != self.n_raw {
            return Err(MeaError::shape("raw signal rows", self.n_raw, raw.nrows()));
        }
        let mut out = Array2::<f32>::zeros((N_CHANNELS, raw.ncols()));
        for (c, src) in self.sources.iter().enumerate() {
            if let Some(i) = *src {
                out.row_mut(c).assign(&raw.row(i));
            }
        }
        Ok(out)
    }

    /// Scatter per-row timestamp lists into 60 canonical lists.
    pub fn canonical_timestamps(&self, raw: &[Vec<usize>]) -> Result<Vec<Vec<usize>>> {
        if raw.len() != self.n_raw {
            return Err(MeaError::shape("raw timestamp rows", self.n_raw, raw.len()));
        }
        Ok(self
            .sources
            .iter()
            .map(|src| src.map(|i| raw[i].clone()).unwrap_or_default())
            .collect())
    }
}

// ── Mapper ────────────────────────────────────────────────────────────────────

/// Rearranges raw rows into the canonical layout.
#[derive(Debug, Clone, Copy)]
pub struct ChannelMapper<'a> {
    mapping: &'a ElectrodeMapping,
}

impl<'a> ChannelMapper<'a> {
    pub fn new(mapping: &'a ElectrodeMapping) -> Self {
        Self { mapping }
    }

    /// Resolve every `channel_info` entry without touching any data.
    pub fn plan(&self, channel_info: &[u32]) -> Result<MappingReport> {
        let mut sources = vec![None; N_CHANNELS];
        let mut unused = Vec::new();
        let mut unmapped = Vec::new();

        for (raw_index, &id) in channel_info.iter().enumerate() {
            match self.mapping.resolve(id) {
                Slot::Unused => unused.push(raw_index),
                Slot::Mapped(c) => {
                    if let Some(first_raw) = sources[c] {
                        return Err(MeaError::DuplicateCanonicalIndex {
                            index: c,
                            first_raw,
                            second_raw: raw_index,
                        });
                    }
                    sources[c] = Some(raw_index);
                }
                Slot::Unmapped(reason) => {
                    tracing::warn!(raw_index, id, ?reason, "channel dropped from canonical layout");
                    unmapped.push(UnmappedChannel { raw_index, id, reason });
                }
            }
        }

        let report = MappingReport { sources, unused, unmapped, n_raw: channel_info.len() };
        tracing::debug!(
            n_raw = report.n_raw,
            mapped = report.n_mapped(),
            unused = report.unused.len(),
            unmapped = report.n_unmapped(),
            "channel mapping resolved"
        );
        Ok(report)
    }

    /// Map a raw signal ([R, T]) to the canonical `[60, T]` layout.
    pub fn map_signal(
        &self,
        raw: &Array2<f32>,
        channel_info: &[u32],
    ) -> Result<(Array2<f32>, MappingReport)> {
        let report = self.plan(channel_info)?;
        let canonical = report.canonical_signal(raw)?;
        Ok((canonical, report))
    }

    /// Map raw per-row spike timestamps to 60 canonical lists.
    pub fn map_timestamps(
        &self,
        raw: &[Vec<usize>],
        channel_info: &[u32],
    ) -> Result<(Vec<Vec<usize>>, MappingReport)> {
        let report = self.plan(channel_info)?;
        let canonical = report.canonical_timestamps(raw)?;
        Ok((canonical, report))
    }
}

// ── Node tables ───────────────────────────────────────────────────────────────

/// One row of a wiring table: amplifier channel → MEA square label.
///
/// The square is kept as raw JSON because wiring sheets mark unconnected
/// pads with text.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NodeEntry {
    #[serde(rename = "Intan")]
    pub intan: usize,
    #[serde(rename = "MEA Square")]
    pub mea_square: serde_json::Value,
}

impl NodeEntry {
    /// Square label as a channel id; `0` when absent or non-numeric.
    pub fn square_id(&self) -> u32 {
        match &self.mea_square {
            serde_json::Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()).unwrap_or(0),
            serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }
}

/// Parse a JSON array of wiring-table rows.
pub fn parse_node_table(json: &str) -> Result<Vec<NodeEntry>> {
    Ok(serde_json::from_str(json)?)
}

/// Build a `channel_info` array of length `n_channels` from a wiring table.
///
/// Amplifier channels not listed stay `0`.
pub fn channel_info_from_nodes(nodes: &[NodeEntry], n_channels: usize) -> Result<Vec<u32>> {
    let mut info = vec![0u32; n_channels];
    for node in nodes {
        let slot = info
            .get_mut(node.intan)
            .ok_or_else(|| MeaError::shape("amplifier channel index", n_channels, node.intan))?;
        *slot = node.square_id();
    }
    Ok(info)
}
