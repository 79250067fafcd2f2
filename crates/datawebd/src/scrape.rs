//! Reshaping raw instrument pages into a `Reading`.
//!
//! The archive serves flat channel lists per group; the blockserver serves
//! the configuration (group membership and block visibility). This module
//! owns both wire shapes and the rules for combining them: block merging,
//! visibility tagging, run-metadata selection, and run-duration formatting.

use dataweb_common::{Block, BlockDetails, BlockStatus, FetchError, Reading};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Run metadata PVs forwarded to dataweb screens, in archive order.
const RUN_METADATA_PVS: &[&str] = &[
    "RUNSTATE",
    "RUNNUMBER",
    "_RBNUMBER",
    "TITLE",
    "DISPLAY",
    "_USERNAME",
    "STARTTIME",
    "RUNDURATION",
    "RUNDURATION_PD",
    "GOODFRAMES",
    "GOODFRAMES_PD",
    "RAWFRAMES",
    "RAWFRAMES_PD",
    "PERIOD",
    "NUMPERIODS",
    "PERIODSEQ",
    "BEAMCURRENT",
    "TOTALUAMPS",
    "COUNTRATE",
    "DAEMEMORYUSED",
    "TOTALCOUNTS",
    "DAETIMINGSOURCE",
    "MONITORCOUNTS",
    "MONITORSPECTRUM",
    "MONITORFROM",
    "MONITORTO",
    "NUMTIMECHANNELS",
    "NUMSPECTRA",
];

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// One archive group page.
#[derive(Debug, Default, Deserialize)]
pub struct ChannelList {
    #[serde(rename = "Channels", default)]
    pub channels: Vec<Channel>,
}

/// One archived channel within a group.
#[derive(Debug, Deserialize)]
pub struct Channel {
    /// Full PV path; the block name is the segment after the last ':'.
    #[serde(rename = "Channel")]
    pub name: String,

    #[serde(rename = "Connected", default = "default_connected")]
    pub connected: bool,

    #[serde(rename = "Current Value")]
    pub current_value: Option<CurrentValue>,
}

fn default_connected() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CurrentValue {
    #[serde(rename = "Value", default)]
    pub value: Value,

    #[serde(rename = "Alarm", default)]
    pub alarm: String,

    #[serde(rename = "Units", default)]
    pub units: String,
}

/// The blockserver configuration page.
#[derive(Debug, Deserialize)]
pub struct BlockserverConfig {
    pub name: String,

    #[serde(default)]
    pub groups: Vec<GroupConfig>,

    #[serde(default)]
    pub blocks: Vec<BlockConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GroupConfig {
    pub name: String,

    #[serde(default)]
    pub blocks: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BlockConfig {
    pub name: String,
    pub visible: bool,
}

impl BlockserverConfig {
    fn is_visible(&self, block_name: &str) -> Option<bool> {
        self.blocks
            .iter()
            .find(|b| b.name == block_name)
            .map(|b| b.visible)
    }
}

// ---------------------------------------------------------------------------
// Reshaping
// ---------------------------------------------------------------------------

/// Turn an archive group page into blocks keyed by block name.
pub fn extract_blocks(list: &ChannelList) -> HashMap<String, Block> {
    let mut blocks = HashMap::new();
    for channel in &list.channels {
        let name = channel
            .name
            .rsplit(':')
            .next()
            .unwrap_or(&channel.name)
            .to_string();

        let block = match &channel.current_value {
            Some(current) if channel.connected && !current.value.is_null() => Block::new(
                name.clone(),
                BlockStatus::Connected,
                current.value.clone(),
                current.alarm.clone(),
                true,
                current.units.clone(),
            ),
            _ => Block::disconnected(name.clone()),
        };
        blocks.insert(name, block);
    }
    blocks
}

/// Merge two block sources; `second` wins on key collision.
pub fn merge_blocks(
    first: HashMap<String, Block>,
    second: HashMap<String, Block>,
) -> HashMap<String, Block> {
    let mut merged = first;
    merged.extend(second);
    merged
}

/// Rewrite a run-duration block from raw seconds to a readable duration.
///
/// Disconnected blocks and values that are not whole seconds are left
/// untouched. Units are cleared because the formatted value carries them.
fn convert_seconds(block: &mut Block) {
    if !block.is_connected() {
        return;
    }
    let total = match &block.value {
        Value::Number(n) => match n.as_i64() {
            Some(v) => v,
            None => return,
        },
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(v) => v,
            Err(_) => return,
        },
        _ => return,
    };

    let seconds = total % 60;
    let minutes = total / 60;
    let hours = minutes / 60;
    let minutes = minutes % 60;

    let formatted = if hours == 0 && minutes == 0 {
        format!("{} s", seconds)
    } else if hours == 0 {
        format!("{} min {} s", minutes, seconds)
    } else {
        format!("{} hr {} min {} s", hours, minutes, seconds)
    };

    block.value = Value::String(formatted);
    block.units.clear();
}

/// Pick the run metadata PVs out of the INST group.
///
/// Archive channels for these carry a `.VAL` suffix which is stripped from
/// the served name.
pub fn select_inst_pvs(mut inst_blocks: HashMap<String, Block>) -> BTreeMap<String, BlockDetails> {
    let mut wanted = BTreeMap::new();
    for pv in RUN_METADATA_PVS {
        if let Some(mut block) = inst_blocks.remove(&format!("{}.VAL", pv)) {
            if *pv == "RUNDURATION" || *pv == "RUNDURATION_PD" {
                convert_seconds(&mut block);
            }
            wanted.insert(pv.to_string(), block.details());
        }
    }
    wanted
}

/// Assemble the full reading for one instrument.
///
/// `blocks_log` and `blocks_nolog` come from the BLOCKS and DATAWEB archive
/// groups; the latter wins where both archive the same block.
pub fn build_reading(
    config: &BlockserverConfig,
    blocks_log: HashMap<String, Block>,
    blocks_nolog: HashMap<String, Block>,
    inst_blocks: HashMap<String, Block>,
) -> Result<Reading, FetchError> {
    let mut blocks_all = merge_blocks(blocks_log, blocks_nolog);

    for (name, block) in blocks_all.iter_mut() {
        block.visibility = config
            .is_visible(name)
            .ok_or_else(|| FetchError::Reshape(format!("block '{}' not in configuration", name)))?;
    }

    let formatted: HashMap<&String, BlockDetails> = blocks_all
        .iter()
        .map(|(name, block)| (name, block.details()))
        .collect();

    let mut groups = BTreeMap::new();
    for group in &config.groups {
        let mut members = BTreeMap::new();
        for block_name in &group.blocks {
            if let Some(details) = formatted.get(block_name) {
                members.insert(block_name.clone(), details.clone());
            }
        }
        groups.insert(group.name.clone(), members);
    }

    Ok(Reading {
        config_name: config.name.clone(),
        groups,
        inst_pvs: select_inst_pvs(inst_blocks),
    })
}
