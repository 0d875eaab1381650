//! Nearest-neighbor model over encoded pings and future-point extrapolation.
//!
//! The model encodes a chronologically sorted corpus (usually one entity's
//! full history) with a [`FeatureEncoder`] and bulk-loads the vectors into an
//! R*-tree. A query returns the `k` closest historical moments; for each of
//! them the corpus is scanned a bounded number of points forward to find
//! where the entity was `horizon` seconds later.

use log::{debug, info};
use rstar::{AABB, PointDistance, RTree, RTreeObject};
use serde::{Deserialize, Serialize};

use crate::Ping;
use crate::error::{OptionExt, Result, TrailError};
use crate::features::{FEATURE_DIMENSIONS, FeatureEncoder, FeatureVector, FeatureWeights};

/// Tunables for the neighbor model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Neighbors returned per query. Default: 10
    pub k: usize,
    /// Points scanned after a neighbor when extrapolating. Default: 100
    pub forward_window: usize,
    /// Horizon used by [`NeighborModel::predict_default`], in seconds. Default: 3600
    pub horizon_seconds: i64,
    pub weights: FeatureWeights,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            k: 10,
            forward_window: 100,
            horizon_seconds: 60 * 60,
            weights: FeatureWeights::default(),
        }
    }
}

impl PredictorConfig {
    /// Replace `k` and the horizon where a value is given, keeping the rest.
    pub fn with_overrides(mut self, k: Option<usize>, horizon_seconds: Option<i64>) -> Self {
        if let Some(k) = k {
            self.k = k;
        }
        if let Some(horizon) = horizon_seconds {
            self.horizon_seconds = horizon;
        }
        self
    }
}

/// An encoded corpus point for R-tree queries.
#[derive(Debug, Clone, Copy)]
struct IndexedFeature {
    idx: usize,
    coords: [f64; FEATURE_DIMENSIONS],
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; FEATURE_DIMENSIONS]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.coords)
    }
}

impl PointDistance for IndexedFeature {
    fn distance_2(&self, point: &[f64; FEATURE_DIMENSIONS]) -> f64 {
        self.coords
            .iter()
            .zip(point.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

/// A corpus point close to a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Index into the model's corpus.
    pub index: usize,
    /// Euclidean distance in feature space.
    pub distance: f64,
}

/// The point found near `neighbor time + horizon`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuturePoint {
    pub index: usize,
    pub ping: Ping,
    /// Absolute difference in seconds from the target time.
    pub time_diff: u64,
}

/// One neighbor of a query with its extrapolated future.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub neighbor: Neighbor,
    pub ping: Ping,
    pub future: Option<FuturePoint>,
}

/// Scan the `window` points after `index` for the one closest in time to
/// `points[index].timestamp + horizon`.
///
/// Ties keep the earliest point. Returns `None` when `index` is out of range
/// or nothing follows it within the window.
pub fn get_future_point(
    points: &[Ping],
    index: usize,
    horizon: i64,
    window: usize,
) -> Option<FuturePoint> {
    let anchor = points.get(index)?;
    let goal = anchor.timestamp.saturating_add(horizon);
    let end = index.saturating_add(window).saturating_add(1).min(points.len());

    let mut best: Option<FuturePoint> = None;
    for (offset, ping) in points[index + 1..end].iter().enumerate() {
        let time_diff = ping.timestamp.abs_diff(goal);
        if best.is_none_or(|b| time_diff < b.time_diff) {
            best = Some(FuturePoint {
                index: index + 1 + offset,
                ping: *ping,
                time_diff,
            });
        }
    }
    best
}

/// All points in the `window` after `index` whose timestamp is at most
/// `points[index].timestamp + horizon`, in corpus order.
pub fn get_future_trail(
    points: &[Ping],
    index: usize,
    horizon: i64,
    window: usize,
) -> Vec<Ping> {
    let Some(anchor) = points.get(index) else {
        return Vec::new();
    };
    let goal = anchor.timestamp.saturating_add(horizon);
    let end = index.saturating_add(window).saturating_add(1).min(points.len());

    points[index + 1..end]
        .iter()
        .filter(|p| p.timestamp <= goal)
        .copied()
        .collect()
}

/// Immutable k-nearest-neighbor model over a ping corpus.
///
/// Safe to query from several threads once built.
pub struct NeighborModel {
    points: Vec<Ping>,
    tree: RTree<IndexedFeature>,
    encoder: FeatureEncoder,
    config: PredictorConfig,
}

impl std::fmt::Debug for NeighborModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeighborModel")
            .field("points", &self.points.len())
            .field("config", &self.config)
            .finish()
    }
}

impl NeighborModel {
    /// Build a model from a corpus.
    ///
    /// The corpus is used as given; callers pass it sorted by timestamp so
    /// that the forward window follows the trail. Every point must have a
    /// valid position.
    pub fn build(points: Vec<Ping>, config: PredictorConfig) -> Result<Self> {
        points.first().ok_or_empty_corpus()?;
        if let Some(index) = points.iter().position(|p| !p.location().is_valid()) {
            return Err(TrailError::InvalidPoint { index });
        }

        let encoder = FeatureEncoder::new(config.weights);
        let indexed: Vec<IndexedFeature> = encoder
            .encode_all(&points)
            .into_iter()
            .enumerate()
            .map(|(idx, v)| IndexedFeature { idx, coords: v.0 })
            .collect();
        let tree = RTree::bulk_load(indexed);

        info!("[Predictor] Built neighbor model over {} points", points.len());

        Ok(Self {
            points,
            tree,
            encoder,
            config,
        })
    }

    pub fn points(&self) -> &[Ping] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: an empty corpus is rejected by [`NeighborModel::build`].
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Corpus point at `index`.
    pub fn point(&self, index: usize) -> Result<&Ping> {
        self.points
            .get(index)
            .ok_or_out_of_range(index, self.points.len())
    }

    /// The `k` corpus points closest to `query` in feature space.
    ///
    /// Sorted by ascending distance; equal distances keep corpus order. A
    /// query without a valid position has no neighbors.
    pub fn kneighbors(&self, query: &Ping, k: usize) -> Vec<Neighbor> {
        let k = k.min(self.points.len());
        if k == 0 {
            return Vec::new();
        }
        if !query.location().is_valid() {
            debug!("[Predictor] Ignoring query with invalid position {:?}", query);
            return Vec::new();
        }

        let target: FeatureVector = self.encoder.encode(query);
        let mut found: Vec<(f64, usize)> = Vec::with_capacity(k);

        // Keep pulling past k while distances tie with the k-th, so the
        // final cut can be made on corpus order.
        for (item, d2) in self.tree.nearest_neighbor_iter_with_distance_2(&target.0) {
            if found.len() >= k && d2 > found[k - 1].0 {
                break;
            }
            found.push((d2, item.idx));
        }

        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found.truncate(k);
        found
            .into_iter()
            .map(|(d2, index)| Neighbor {
                index,
                distance: d2.sqrt(),
            })
            .collect()
    }

    /// Nearest neighbors using the configured `k`.
    pub fn nearest(&self, query: &Ping) -> Vec<Neighbor> {
        self.kneighbors(query, self.config.k)
    }

    /// Future point for a corpus index using the configured window.
    pub fn future_point(&self, index: usize, horizon: i64) -> Result<Option<FuturePoint>> {
        self.point(index)?;
        Ok(get_future_point(
            &self.points,
            index,
            horizon,
            self.config.forward_window,
        ))
    }

    /// Future trail for a corpus index using the configured window.
    pub fn future_trail(&self, index: usize, horizon: i64) -> Result<Vec<Ping>> {
        self.point(index)?;
        Ok(get_future_trail(
            &self.points,
            index,
            horizon,
            self.config.forward_window,
        ))
    }

    /// Neighbors of `query`, each with where it went `horizon` seconds later.
    pub fn predict(&self, query: &Ping, horizon: i64) -> Vec<Prediction> {
        let predictions: Vec<Prediction> = self
            .nearest(query)
            .into_iter()
            .map(|neighbor| Prediction {
                neighbor,
                ping: self.points[neighbor.index],
                future: get_future_point(
                    &self.points,
                    neighbor.index,
                    horizon,
                    self.config.forward_window,
                ),
            })
            .collect();

        debug!(
            "[Predictor] {} neighbors, {} with a future point",
            predictions.len(),
            predictions.iter().filter(|p| p.future.is_some()).count()
        );
        predictions
    }

    /// [`NeighborModel::predict`] with the configured horizon.
    pub fn predict_default(&self, query: &Ping) -> Vec<Prediction> {
        self.predict(query, self.config.horizon_seconds)
    }
}
