//! Arena octree with quadrupole moments.
//!
//! Nodes live in one `Vec` and refer to their children by [`NodeId`].
//! The eight children of a node are allocated contiguously and always
//! after their parent, so a reverse scan over the arena visits every
//! child before its parent; [`Octree::upsweep`] relies on that.
//!
//! Particles are copied into tree order at build time. Each node covers a
//! contiguous slice `start..end` of that order.

use smallvec::SmallVec;

use cadence_core::CollectiveError;
use cadence_domain::BoundingBox;

use crate::multipole::{p2p, Multipole};

/// Maximum subdivision depth. Deeper nodes stay leaves regardless of
/// occupancy, which bounds the tree for coincident particles.
pub const MAX_DEPTH: u32 = 21;

/// `f64` values per node in the wire encoding.
const NODE_WORDS: usize = 17;
/// `f64` values per particle in the wire encoding.
const PARTICLE_WORDS: usize = 5;

/// Index of a node in an [`Octree`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Marker for "no children".
    pub const EMPTY: NodeId = NodeId(u32::MAX);

    /// The root of every non-empty tree.
    pub const ROOT: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One cubic cell of the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct OctreeNode {
    /// Cell center.
    pub center: [f64; 3],
    /// Half the cell edge length.
    pub half: f64,
    /// First of eight contiguous children, or [`NodeId::EMPTY`] for a leaf.
    pub first_child: NodeId,
    /// First particle (tree order) under this node.
    pub start: u32,
    /// One past the last particle under this node.
    pub end: u32,
    /// Aggregated moments. Zero until [`Octree::upsweep`] runs.
    pub multipole: Multipole,
}

impl OctreeNode {
    /// Whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.first_child == NodeId::EMPTY
    }

    /// Number of particles under this node.
    pub fn count(&self) -> usize {
        (self.end - self.start) as usize
    }

    fn contains(&self, p: [f64; 3]) -> bool {
        (0..3).all(|k| (p[k] - self.center[k]).abs() <= self.half)
    }

    fn octant_of(&self, p: [f64; 3]) -> usize {
        (usize::from(p[0] >= self.center[0]) << 2)
            | (usize::from(p[1] >= self.center[1]) << 1)
            | usize::from(p[2] >= self.center[2])
    }

    fn child_center(&self, octant: usize) -> [f64; 3] {
        let q = 0.5 * self.half;
        std::array::from_fn(|k| {
            let bit = (octant >> (2 - k)) & 1;
            if bit == 1 {
                self.center[k] + q
            } else {
                self.center[k] - q
            }
        })
    }
}

/// A point at which the tree's field is evaluated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    /// Position.
    pub pos: [f64; 3],
    /// Smoothing length, used as softening.
    pub h: f64,
    /// Tree-order index of the target itself when it belongs to this tree.
    pub skip: Option<usize>,
}

/// Field contributions and interaction counts from one tree walk.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Interaction {
    /// Acceleration.
    pub acc: [f64; 3],
    /// Potential.
    pub phi: f64,
    /// Particle-particle interactions evaluated.
    pub p2p: u64,
    /// Particle-multipole interactions evaluated.
    pub m2p: u64,
}

impl Interaction {
    /// Add another walk's contributions.
    pub fn merge(&mut self, other: &Interaction) {
        for k in 0..3 {
            self.acc[k] += other.acc[k];
        }
        self.phi += other.phi;
        self.p2p += other.p2p;
        self.m2p += other.m2p;
    }
}

/// An octree over a set of particles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
    m: Vec<f64>,
    h: Vec<f64>,
    /// Tree-order position of each input particle, by input offset.
    slot: Vec<usize>,
}

impl Octree {
    /// Build the tree over `x, y, z, h, m`. Moments are left zero.
    ///
    /// Nodes holding more than `leaf_size` particles are split until
    /// [`MAX_DEPTH`]. An empty input gives an empty tree.
    pub fn build(x: &[f64], y: &[f64], z: &[f64], h: &[f64], m: &[f64], leaf_size: usize) -> Self {
        let Some(bbox) = BoundingBox::from_points(x, y, z) else {
            return Self::default();
        };
        let (center, half) = bbox.cube();
        let n = x.len();
        let mut order: Vec<usize> = (0..n).collect();
        let mut nodes = vec![OctreeNode {
            center,
            // Pad so boundary particles sit strictly inside.
            half: half * (1.0 + 1e-12),
            first_child: NodeId::EMPTY,
            start: 0,
            end: n as u32,
            multipole: Multipole::default(),
        }];

        let leaf_size = leaf_size.max(1);
        let mut pending: Vec<(NodeId, u32)> = vec![(NodeId::ROOT, 0)];
        while let Some((id, depth)) = pending.pop() {
            let node = nodes[id.index()].clone();
            if node.count() <= leaf_size || depth >= MAX_DEPTH {
                continue;
            }

            let span = &mut order[node.start as usize..node.end as usize];
            span.sort_by_key(|&i| node.octant_of([x[i], y[i], z[i]]));
            let mut bounds: SmallVec<[u32; 9]> = SmallVec::new();
            bounds.push(node.start);
            let mut cursor = 0;
            for octant in 0..8 {
                while cursor < span.len() {
                    let i = span[cursor];
                    if node.octant_of([x[i], y[i], z[i]]) != octant {
                        break;
                    }
                    cursor += 1;
                }
                bounds.push(node.start + cursor as u32);
            }

            let first = NodeId(nodes.len() as u32);
            for octant in 0..8 {
                nodes.push(OctreeNode {
                    center: node.child_center(octant),
                    half: 0.5 * node.half,
                    first_child: NodeId::EMPTY,
                    start: bounds[octant],
                    end: bounds[octant + 1],
                    multipole: Multipole::default(),
                });
                pending.push((NodeId(first.0 + octant as u32), depth + 1));
            }
            nodes[id.index()].first_child = first;
        }

        let mut slot = vec![0; n];
        for (pos, &i) in order.iter().enumerate() {
            slot[i] = pos;
        }
        let gather = |src: &[f64]| order.iter().map(|&i| src[i]).collect::<Vec<f64>>();
        Self {
            x: gather(x),
            y: gather(y),
            z: gather(z),
            m: gather(m),
            h: gather(h),
            nodes,
            slot,
        }
    }

    /// Aggregate moments bottom-up: P2M at leaves, M2M above.
    pub fn upsweep(&mut self) {
        for idx in (0..self.nodes.len()).rev() {
            let node = &self.nodes[idx];
            let multipole = if node.is_leaf() {
                let r = node.start as usize..node.end as usize;
                Multipole::from_particles(
                    &self.x[r.clone()],
                    &self.y[r.clone()],
                    &self.z[r.clone()],
                    &self.m[r],
                )
            } else {
                let c = node.first_child.index();
                let children: SmallVec<[Multipole; 8]> =
                    self.nodes[c..c + 8].iter().map(|n| n.multipole).collect();
                Multipole::combine(&children)
            };
            self.nodes[idx].multipole = multipole;
        }
    }

    /// The node arena.
    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    /// Number of particles in the tree.
    pub fn len(&self) -> usize {
        self.m.len()
    }

    /// Whether the tree holds no particles.
    pub fn is_empty(&self) -> bool {
        self.m.is_empty()
    }

    /// Moments of the whole tree.
    pub fn root(&self) -> Option<&Multipole> {
        self.nodes.first().map(|n| &n.multipole)
    }

    /// Tree-order position of the input particle at `offset`.
    ///
    /// Only meaningful on a locally built tree; decoded trees carry no
    /// input order.
    pub fn slot_of(&self, offset: usize) -> Option<usize> {
        self.slot.get(offset).copied()
    }

    /// Evaluate the tree's field at `target`.
    ///
    /// A node is accepted as a multipole when the target lies outside its
    /// cell and `(2 half)² < θ² r²`, with `r` the distance to the node's
    /// center of mass. Otherwise it is opened, or summed particle by
    /// particle at a leaf. `theta2 = 0` reduces to an exact direct sum.
    pub fn walk(&self, target: &Target, theta2: f64, g: f64) -> Interaction {
        let mut out = Interaction::default();
        if self.nodes.is_empty() {
            return out;
        }
        let p = target.pos;
        let mut stack: SmallVec<[NodeId; 64]> = SmallVec::new();
        stack.push(NodeId::ROOT);

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.index()];
            if node.count() == 0 {
                continue;
            }
            let mp = &node.multipole;
            let d = [p[0] - mp.com[0], p[1] - mp.com[1], p[2] - mp.com[2]];
            let r2 = d[0] * d[0] + d[1] * d[1] + d[2] * d[2];
            let width = 2.0 * node.half;

            if !node.contains(p) && width * width < theta2 * r2 {
                let (a, phi) = mp.m2p(d, target.h * target.h, g);
                for k in 0..3 {
                    out.acc[k] += a[k];
                }
                out.phi += phi;
                out.m2p += 1;
            } else if node.is_leaf() {
                for j in node.start as usize..node.end as usize {
                    if target.skip == Some(j) {
                        continue;
                    }
                    let s = [self.x[j] - p[0], self.y[j] - p[1], self.z[j] - p[2]];
                    let eps = target.h.max(self.h[j]);
                    let (a, phi) = p2p(s, self.m[j], eps * eps, g);
                    for k in 0..3 {
                        out.acc[k] += a[k];
                    }
                    out.phi += phi;
                    out.p2p += 1;
                }
            } else {
                let first = node.first_child.0;
                stack.extend((0..8).map(|c| NodeId(first + c)));
            }
        }
        out
    }

    /// Flatten the tree for exchange between ranks.
    ///
    /// Layout: `[n_nodes, n_particles]`, then per node
    /// `center(3) half first_child start end mass com(3) quad(6)` with
    /// `first_child = -1` for leaves, then per particle `x y z m h`.
    pub fn encode(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(
            2 + NODE_WORDS * self.nodes.len() + PARTICLE_WORDS * self.len(),
        );
        out.push(self.nodes.len() as f64);
        out.push(self.len() as f64);
        for node in &self.nodes {
            out.extend_from_slice(&node.center);
            out.push(node.half);
            out.push(if node.is_leaf() {
                -1.0
            } else {
                f64::from(node.first_child.0)
            });
            out.push(f64::from(node.start));
            out.push(f64::from(node.end));
            out.push(node.multipole.mass);
            out.extend_from_slice(&node.multipole.com);
            out.extend_from_slice(&node.multipole.quad);
        }
        for j in 0..self.len() {
            out.extend_from_slice(&[self.x[j], self.y[j], self.z[j], self.m[j], self.h[j]]);
        }
        out
    }

    /// Rebuild a tree encoded by a peer with [`encode`](Octree::encode).
    pub fn decode(words: &[f64]) -> Result<Self, CollectiveError> {
        let malformed = |reason| CollectiveError::MalformedPayload { reason };
        let [n_nodes, n_particles] = match words {
            [a, b, ..] => [count(*a), count(*b)],
            _ => return Err(malformed("tree header truncated")),
        };
        let (Some(n_nodes), Some(n_particles)) = (n_nodes, n_particles) else {
            return Err(malformed("tree header is not a count"));
        };
        if words.len() != 2 + NODE_WORDS * n_nodes + PARTICLE_WORDS * n_particles {
            return Err(malformed("tree payload length does not match header"));
        }

        let mut nodes = Vec::with_capacity(n_nodes);
        for (idx, w) in words[2..2 + NODE_WORDS * n_nodes]
            .chunks_exact(NODE_WORDS)
            .enumerate()
        {
            // Children always follow their parent; this also rules out cycles.
            let first_child = if w[4] == -1.0 {
                NodeId::EMPTY
            } else {
                match count(w[4]) {
                    Some(c) if c > idx && c + 8 <= n_nodes => NodeId(c as u32),
                    _ => return Err(malformed("child index out of range")),
                }
            };
            let (Some(start), Some(end)) = (count(w[5]), count(w[6])) else {
                return Err(malformed("particle range is not a count"));
            };
            if start > end || end > n_particles {
                return Err(malformed("particle range out of bounds"));
            }
            nodes.push(OctreeNode {
                center: [w[0], w[1], w[2]],
                half: w[3],
                first_child,
                start: start as u32,
                end: end as u32,
                multipole: Multipole {
                    mass: w[7],
                    com: [w[8], w[9], w[10]],
                    quad: [w[11], w[12], w[13], w[14], w[15], w[16]],
                },
            });
        }

        let mut tree = Self {
            nodes,
            ..Self::default()
        };
        for p in words[2 + NODE_WORDS * n_nodes..].chunks_exact(PARTICLE_WORDS) {
            tree.x.push(p[0]);
            tree.y.push(p[1]);
            tree.z.push(p[2]);
            tree.m.push(p[3]);
            tree.h.push(p[4]);
        }
        Ok(tree)
    }
}

/// A non-negative integral value that fits a `u32` index.
fn count(v: f64) -> Option<usize> {
    (v >= 0.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX - 8)).then_some(v as usize)
}
