// Turning a generated track into placed pieces.
//
// The engine never renders anything itself. A caller supplies an
// `AssetCatalog` (node type to asset) and a `SegmentSink` (something that can
// create, move, and destroy instances), and `assemble()` drives them:
//
// 1. Resolve every needed node type in the catalog. Any miss is reported as
//    `AssetMismatch` before a single instance exists.
// 2. Optionally lay a background of blank tiles over the grid plus a
//    one-cell border.
// 3. Instantiate each segment at `position * cell_size`, optionally shifted so
//    the start segment sits at the origin, rotated by its heading.
//
// `NamedCatalog` is the stock catalog: it maps each node type to the first
// asset whose name contains the type's asset name.
//
// See also: `generator.rs` for `GeneratedTrack`, `types.rs` for
// `NodeType::asset_name`.

use crate::error::TrackGenError;
use crate::generator::GeneratedTrack;
use crate::types::{GridCoord, NodeType};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Lookup from node type to a concrete asset.
pub trait AssetCatalog {
    type Asset;

    fn lookup(&self, node_type: NodeType) -> Option<&Self::Asset>;
}

/// Receiver of placement calls.
pub trait SegmentSink {
    type Asset;
    type Handle;

    fn instantiate(&mut self, node_type: NodeType, asset: &Self::Asset) -> Self::Handle;
    fn set_transform(&mut self, handle: &Self::Handle, position: [f32; 3], rotation: f32, scale: f32);
    fn destroy(&mut self, handle: Self::Handle);
}

/// Catalog over named assets, matched by substring on the asset name.
#[derive(Clone, Debug)]
pub struct NamedCatalog<A> {
    assets: Vec<(String, A)>,
    by_type: FxHashMap<NodeType, usize>,
}

impl<A> NamedCatalog<A> {
    pub fn new(assets: Vec<(String, A)>) -> Self {
        let mut by_type = FxHashMap::default();
        for node_type in NodeType::ALL {
            let wanted = node_type.asset_name();
            if let Some(i) = assets.iter().position(|(name, _)| name.contains(wanted)) {
                by_type.insert(node_type, i);
            }
        }
        Self { assets, by_type }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Name of the asset resolved for `node_type`.
    pub fn name_for(&self, node_type: NodeType) -> Option<&str> {
        self.by_type
            .get(&node_type)
            .map(|i| self.assets[*i].0.as_str())
    }
}

impl<A> AssetCatalog for NamedCatalog<A> {
    type Asset = A;

    fn lookup(&self, node_type: NodeType) -> Option<&A> {
        self.by_type.get(&node_type).map(|i| &self.assets[*i].1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssemblyOptions {
    /// World units per grid cell.
    pub cell_size: f32,
    /// Uniform scale passed to every transform.
    pub scale: f32,
    /// Shift everything so the start segment sits at the origin.
    pub recenter: bool,
    /// Surround the track with blank tiles.
    pub background: bool,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            cell_size: 1.0,
            scale: 1.0,
            recenter: true,
            background: false,
        }
    }
}

/// Handles of everything `assemble()` created.
#[derive(Debug)]
pub struct AssembledTrack<H> {
    /// One handle per segment, in flow order.
    pub segments: Vec<H>,
    pub background: Vec<H>,
}

impl<H> AssembledTrack<H> {
    /// Destroy every instance, track first.
    pub fn dismantle<S: SegmentSink<Handle = H>>(self, sink: &mut S) {
        for handle in self.segments.into_iter().chain(self.background) {
            sink.destroy(handle);
        }
    }
}

fn world_position(pos: GridCoord, cell_size: f32, origin: [f32; 3]) -> [f32; 3] {
    [
        pos.x as f32 * cell_size - origin[0],
        pos.y as f32 * cell_size - origin[1],
        pos.z as f32 * cell_size - origin[2],
    ]
}

/// Place `track` through `sink` using assets from `catalog`.
pub fn assemble<C, S>(
    track: &GeneratedTrack,
    catalog: &C,
    sink: &mut S,
    options: &AssemblyOptions,
) -> Result<AssembledTrack<S::Handle>, TrackGenError>
where
    C: AssetCatalog<Asset = S::Asset>,
    S: SegmentSink,
{
    let mut assets = Vec::with_capacity(track.segments.len());
    for segment in &track.segments {
        let asset = catalog
            .lookup(segment.node_type)
            .ok_or(TrackGenError::AssetMismatch {
                node_type: segment.node_type,
            })?;
        assets.push(asset);
    }
    let blank = if options.background {
        Some(catalog.lookup(NodeType::Blank).ok_or(TrackGenError::AssetMismatch {
            node_type: NodeType::Blank,
        })?)
    } else {
        None
    };

    let origin = match track.segments.first() {
        Some(first) if options.recenter => world_position(first.position, options.cell_size, [0.0; 3]),
        _ => [0.0; 3],
    };

    let mut background = Vec::new();
    if let Some(blank) = blank {
        let (columns, rows) = (track.grid.columns as i32, track.grid.rows as i32);
        for z in 0..track.grid.depth as i32 {
            for y in -1..=rows {
                for x in -1..=columns {
                    let handle = sink.instantiate(NodeType::Blank, blank);
                    let position = world_position(GridCoord::new(x, y, z), options.cell_size, origin);
                    sink.set_transform(&handle, position, 0.0, options.scale);
                    background.push(handle);
                }
            }
        }
    }

    let mut segments = Vec::with_capacity(track.segments.len());
    for (segment, asset) in track.segments.iter().zip(assets) {
        let handle = sink.instantiate(segment.node_type, asset);
        let position = world_position(segment.position, options.cell_size, origin);
        sink.set_transform(&handle, position, segment.rotation.degrees(), options.scale);
        segments.push(handle);
    }

    Ok(AssembledTrack {
        segments,
        background,
    })
}
