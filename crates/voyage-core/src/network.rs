//! Static navigational graph of offshore waypoints and shortest-path search.
//!
//! The graph is built once per process from [`GULF_NODES`] and never mutated.
//! Connections are declared on either endpoint in the table and normalized
//! into symmetric adjacency at load time.

use crate::geometry::distance_nm;
use crate::models::GeoPoint;
use serde::Serialize;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::sync::OnceLock;

/// Static description of one waypoint node.
pub struct NodeSpec {
    pub id: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub name: &'static str,
    pub connections: &'static [&'static str],
}

const fn node(
    id: &'static str,
    lat: f64,
    lon: f64,
    name: &'static str,
    connections: &'static [&'static str],
) -> NodeSpec {
    NodeSpec {
        id,
        lat,
        lon,
        name,
        connections,
    }
}

/// Offshore waypoints covering the Arabian Gulf, Strait of Hormuz and Gulf of Oman.
pub const GULF_NODES: [NodeSpec; 39] = [
    node("kuwait_approach", 29.25, 48.45, "Kuwait Approach", &["gulf_north"]),
    node(
        "gulf_north",
        28.60,
        49.80,
        "Northern Gulf",
        &["bushehr_offshore", "jubail_offshore", "gulf_central_north"],
    ),
    node("bushehr_offshore", 28.75, 50.55, "Bushehr Offshore", &["gulf_central_north"]),
    node(
        "jubail_offshore",
        27.10,
        49.85,
        "Jubail Offshore",
        &["dammam_offshore", "gulf_central_north"],
    ),
    node("dammam_offshore", 26.65, 50.30, "Dammam Offshore", &["bahrain_north"]),
    node(
        "bahrain_north",
        26.45,
        50.60,
        "Bahrain North",
        &["bahrain_approach", "gulf_central_north"],
    ),
    node("bahrain_approach", 26.30, 50.75, "Bahrain Approach", &["qatar_north"]),
    node(
        "gulf_central_north",
        27.60,
        51.00,
        "Central Gulf North",
        &["gulf_central", "qatar_north"],
    ),
    node(
        "qatar_north",
        26.35,
        51.30,
        "Qatar North",
        &["ras_laffan_offshore", "gulf_central"],
    ),
    node(
        "ras_laffan_offshore",
        26.00,
        51.80,
        "Ras Laffan Offshore",
        &["doha_approach", "gulf_central"],
    ),
    node(
        "doha_approach",
        25.35,
        51.75,
        "Doha Approach",
        &["qatar_east_south", "das_island_offshore"],
    ),
    node("qatar_east_south", 24.85, 51.85, "Qatar South-East", &["sir_bani_yas_offshore"]),
    node("qatar_west", 25.40, 50.60, "Gulf of Salwa", &["bahrain_approach"]),
    node(
        "gulf_central",
        27.00,
        52.00,
        "Central Gulf",
        &["gulf_central_east", "das_island_offshore"],
    ),
    node("sir_bani_yas_offshore", 24.45, 52.30, "Sir Bani Yas Offshore", &["ruwais_offshore"]),
    node(
        "ruwais_offshore",
        24.35,
        52.75,
        "Ruwais Offshore",
        &["das_island_offshore", "zirku_offshore"],
    ),
    node(
        "das_island_offshore",
        24.95,
        52.95,
        "Das Island Offshore",
        &["zirku_offshore", "gulf_central_east"],
    ),
    node(
        "zirku_offshore",
        24.75,
        53.55,
        "Zirku Offshore",
        &["abu_dhabi_west_channel", "abu_dhabi_outer", "gulf_east"],
    ),
    node(
        "abu_dhabi_west_channel",
        24.52,
        54.12,
        "Abu Dhabi West Channel",
        &["abu_dhabi_port", "abu_dhabi_outer"],
    ),
    node("abu_dhabi_port", 24.55, 54.38, "Abu Dhabi Port Approach", &["abu_dhabi_outer"]),
    node(
        "abu_dhabi_outer",
        24.75,
        54.30,
        "Abu Dhabi Outer Anchorage",
        &["jebel_ali_approach", "gulf_east"],
    ),
    node("jebel_ali_approach", 25.10, 54.95, "Jebel Ali Approach", &["dubai_offshore"]),
    node(
        "dubai_offshore",
        25.35,
        55.20,
        "Dubai Offshore",
        &["sharjah_anchorage", "gulf_east"],
    ),
    node("sharjah_anchorage", 25.45, 55.25, "Sharjah Anchorage", &["ras_al_khaimah_offshore"]),
    node(
        "ras_al_khaimah_offshore",
        25.95,
        55.75,
        "Ras Al Khaimah Offshore",
        &["hormuz_west", "tunb_passage"],
    ),
    node("gulf_central_east", 26.40, 53.50, "Central Gulf East", &["gulf_east"]),
    node("gulf_east", 26.10, 54.60, "Eastern Gulf", &["tunb_passage"]),
    node("tunb_passage", 26.15, 55.45, "Tunb Passage", &["hormuz_west"]),
    node("hormuz_west", 26.35, 55.75, "Strait of Hormuz West", &["hormuz_strait"]),
    node("hormuz_strait", 26.55, 56.45, "Strait of Hormuz", &["hormuz_east"]),
    node(
        "hormuz_east",
        26.30,
        56.75,
        "Strait of Hormuz East",
        &["khor_fakkan_offshore", "jask_offshore"],
    ),
    node(
        "khor_fakkan_offshore",
        25.40,
        56.55,
        "Khor Fakkan Offshore",
        &["fujairah_anchorage", "gulf_of_oman_central"],
    ),
    node("fujairah_anchorage", 25.15, 56.50, "Fujairah Anchorage", &["sohar_offshore"]),
    node(
        "sohar_offshore",
        24.45,
        56.95,
        "Sohar Offshore",
        &["gulf_of_oman_central", "muscat_offshore"],
    ),
    node("jask_offshore", 25.35, 57.60, "Jask Offshore", &["gulf_of_oman_central"]),
    node(
        "gulf_of_oman_central",
        24.60,
        58.20,
        "Central Gulf of Oman",
        &["muscat_offshore", "arabian_sea_approach"],
    ),
    node("muscat_offshore", 23.75, 58.70, "Muscat Offshore", &["ras_al_hadd_offshore"]),
    node(
        "ras_al_hadd_offshore",
        22.75,
        59.95,
        "Ras Al Hadd Offshore",
        &["arabian_sea_approach"],
    ),
    node("arabian_sea_approach", 22.80, 60.50, "Arabian Sea Approach", &[]),
];

/// A named offshore waypoint in the navigational graph.
#[derive(Debug, Clone, Serialize)]
pub struct WaypointNode {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub connections: BTreeSet<String>,
}

impl WaypointNode {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Arena-style graph: nodes in a vector, adjacency as index lists with edge weights.
#[derive(Debug, Clone)]
pub struct NavGraph {
    nodes: Vec<WaypointNode>,
    index: HashMap<String, usize>,
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl NavGraph {
    /// The process-wide Gulf graph, built on first use.
    pub fn gulf() -> &'static NavGraph {
        static GRAPH: OnceLock<NavGraph> = OnceLock::new();
        GRAPH.get_or_init(|| NavGraph::from_specs(&GULF_NODES))
    }

    /// Build a graph, symmetrizing connections and dropping unknown ids.
    pub fn from_specs(specs: &[NodeSpec]) -> Self {
        let mut nodes: Vec<WaypointNode> = Vec::with_capacity(specs.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(specs.len());
        for spec in specs {
            if index.contains_key(spec.id) {
                tracing::warn!("Duplicate waypoint node {} ignored", spec.id);
                continue;
            }
            index.insert(spec.id.to_string(), nodes.len());
            nodes.push(WaypointNode {
                id: spec.id.to_string(),
                lat: spec.lat,
                lon: spec.lon,
                name: spec.name.to_string(),
                connections: BTreeSet::new(),
            });
        }

        let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();
        for spec in specs {
            let Some(&from) = index.get(spec.id) else {
                continue;
            };
            for target in spec.connections {
                let Some(&to) = index.get(*target) else {
                    tracing::warn!("Waypoint {} connects to unknown node {}", spec.id, target);
                    continue;
                };
                if from != to {
                    edges.insert((from.min(to), from.max(to)));
                }
            }
        }

        let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); nodes.len()];
        for (a, b) in edges {
            let weight = distance_nm(nodes[a].point(), nodes[b].point());
            adjacency[a].push((b, weight));
            adjacency[b].push((a, weight));
            let b_id = nodes[b].id.clone();
            let a_id = nodes[a].id.clone();
            nodes[a].connections.insert(b_id);
            nodes[b].connections.insert(a_id);
        }

        Self {
            nodes,
            index,
            adjacency,
        }
    }

    pub fn nodes(&self) -> &[WaypointNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&WaypointNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Closest node to `point` and its distance in nm. Linear scan.
    pub fn nearest_node(&self, point: GeoPoint) -> Option<(&WaypointNode, f64)> {
        self.nodes
            .iter()
            .map(|node| (node, distance_nm(point, node.point())))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Dijkstra shortest path between two node ids.
    ///
    /// Returns an empty path when either id is unknown or no path exists; an
    /// empty result means "no route", never a zero-length route.
    pub fn shortest_path(&self, start_id: &str, end_id: &str) -> Vec<&WaypointNode> {
        let (Some(&start), Some(&end)) = (self.index.get(start_id), self.index.get(end_id)) else {
            return Vec::new();
        };

        let mut dist = vec![f64::INFINITY; self.nodes.len()];
        let mut prev: Vec<Option<usize>> = vec![None; self.nodes.len()];
        let mut settled = vec![false; self.nodes.len()];
        let mut open: BinaryHeap<Reverse<(FloatOrd, usize)>> = BinaryHeap::new();

        dist[start] = 0.0;
        open.push(Reverse((FloatOrd(0.0), start)));

        while let Some(Reverse((FloatOrd(cost), current))) = open.pop() {
            if settled[current] {
                continue;
            }
            settled[current] = true;
            if current == end {
                break;
            }
            for &(next, weight) in &self.adjacency[current] {
                if settled[next] {
                    continue;
                }
                let tentative = cost + weight;
                if tentative < dist[next] {
                    dist[next] = tentative;
                    prev[next] = Some(current);
                    open.push(Reverse((FloatOrd(tentative), next)));
                }
            }
        }

        if !settled[end] {
            return Vec::new();
        }

        let mut path = vec![end];
        let mut cursor = end;
        while let Some(previous) = prev[cursor] {
            path.push(previous);
            cursor = previous;
        }
        path.reverse();
        path.into_iter().map(|idx| &self.nodes[idx]).collect()
    }

    /// Cumulative edge distance of a node path.
    pub fn path_length_nm(path: &[&WaypointNode]) -> f64 {
        path.windows(2)
            .map(|pair| distance_nm(pair[0].point(), pair[1].point()))
            .sum()
    }
}
