//! Unilateral contact / membrane potential boundary condition
//!
//! Every "body" boundary node interacts with the "rigid" boundary nodes
//! found within a search radius. For each body-rigid pair the gap vector is
//! projected onto the rigid surface normal and a quadratic or quartic
//! penalty in (projected gap - target minimum distance) contributes energy,
//! residual, and stiffness, each share scaled by 1/number-of-neighbors.
//!
//! Neighbor lists and rigid-surface normals are recomputed once per load
//! step, not per Newton iteration, consistent with the other boundary
//! conditions' staggering.
//!
//! In flexible mode the rigid boundary becomes an elastic membrane: its
//! nodes get their own degrees of freedom appended after the body DOFs, the
//! penalty couples body and membrane blocks, and an edge-spring elastic
//! energy over the membrane mesh resists stretching.

use std::str::FromStr;

use nalgebra::Vector3;
use rayon::prelude::*;

use crate::error::{Result, SimError};
use crate::mesh::FeMesh;
use crate::model::{averaged_surface_normals, ModelResult, Request};

/// Penalty form applied to the projected gap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PotentialKind {
    Quadratic,
    Quartic,
}

impl FromStr for PotentialKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "quadratic" => Ok(PotentialKind::Quadratic),
            "quartic" => Ok(PotentialKind::Quartic),
            other => Err(SimError::UnknownPotentialType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContactPotential {
    kind: PotentialKind,
    /// Surface mesh of the rigid (or membrane) boundary, independently
    /// numbered 0..num_rigid_nodes
    rigid_mesh: FeMesh,
    /// Body boundary nodes, in the body mesh's global numbering
    body_nodes: Vec<usize>,
    search_radius: f64,
    well_depth: f64,
    /// Target minimum distance per rigid node
    min_distance_per_rigid: Vec<f64>,
    /// Optional cap: keep only the k nearest neighbors
    max_neighbors: Option<usize>,
    /// Outward normals at rigid nodes, refreshed per load step
    rigid_normals: Vec<Vector3<f64>>,
    node_to_elems: Vec<Vec<usize>>,
    /// Per body node, the rigid nodes within the search radius
    neighbors: Vec<Vec<usize>>,
    /// Edge-spring stiffness when the boundary is an elastic membrane
    membrane_stiffness: Option<f64>,
}

impl ContactPotential {
    pub fn new(
        kind: PotentialKind,
        rigid_mesh: FeMesh,
        body_nodes: Vec<usize>,
        search_radius: f64,
        well_depth: f64,
        min_distance: f64,
    ) -> Self {
        assert!(search_radius > 0.0, "search radius must be positive");
        assert!(well_depth > 0.0, "well depth must be positive");

        let num_rigid = rigid_mesh.num_nodes();
        let all_rigid: Vec<usize> = (0..num_rigid).collect();
        let node_to_elems = rigid_mesh.elements_adjacent_to(&all_rigid);

        log::info!(
            "contact potential ({:?}) between {} body nodes and {} rigid nodes",
            kind,
            body_nodes.len(),
            num_rigid
        );

        Self {
            kind,
            rigid_mesh,
            neighbors: vec![Vec::new(); body_nodes.len()],
            body_nodes,
            search_radius,
            well_depth,
            min_distance_per_rigid: vec![min_distance; num_rigid],
            max_neighbors: None,
            rigid_normals: vec![Vector3::zeros(); num_rigid],
            node_to_elems,
            membrane_stiffness: None,
        }
    }

    /// Keep only the k nearest neighbors per body node
    pub fn set_max_neighbors(&mut self, k: usize) {
        self.max_neighbors = Some(k);
    }

    pub fn set_search_radius(&mut self, radius: f64) {
        assert!(radius > 0.0, "search radius must be positive");
        self.search_radius = radius;
    }

    /// Turn the rigid boundary into an elastic membrane with the given
    /// edge-spring stiffness; the model appends the membrane DOFs
    pub(crate) fn set_membrane_stiffness(&mut self, stiffness: f64) {
        assert!(stiffness > 0.0, "membrane stiffness must be positive");
        self.membrane_stiffness = Some(stiffness);
    }

    pub fn is_flexible(&self) -> bool {
        self.membrane_stiffness.is_some()
    }

    pub fn rigid_mesh(&self) -> &FeMesh {
        &self.rigid_mesh
    }

    pub fn body_nodes(&self) -> &[usize] {
        &self.body_nodes
    }

    pub fn rigid_normals(&self) -> &[Vector3<f64>] {
        &self.rigid_normals
    }

    pub fn neighbors(&self) -> &[Vec<usize>] {
        &self.neighbors
    }

    /// Current position of a rigid node: its own DOFs in flexible mode, the
    /// fixed reference coordinates otherwise
    fn rigid_position(&self, main_dofs: usize, field: &[f64], node: usize) -> Vector3<f64> {
        if self.is_flexible() {
            Vector3::new(
                field[main_dofs + node * 3],
                field[main_dofs + node * 3 + 1],
                field[main_dofs + node * 3 + 2],
            )
        } else {
            self.rigid_mesh.x(node)
        }
    }

    fn body_position(field: &[f64], node: usize) -> Vector3<f64> {
        Vector3::new(field[node * 3], field[node * 3 + 1], field[node * 3 + 2])
    }

    /// Refresh normals (flexible mode) and neighbor lists from the current
    /// configuration; called once per load step
    pub(crate) fn refresh(&mut self, main_dofs: usize, field: &[f64]) {
        if self.is_flexible() {
            self.refresh_normals(main_dofs, field);
        } else if self.rigid_normals.iter().all(|n| n.norm() == 0.0) {
            // Rigid boundary: normals never move, computed once
            self.refresh_normals(main_dofs, field);
        }
        self.search_neighbors(main_dofs, field);
    }

    pub(crate) fn refresh_normals(&mut self, main_dofs: usize, field: &[f64]) {
        let all_rigid: Vec<usize> = (0..self.rigid_mesh.num_nodes()).collect();
        let position = |node: usize| self.rigid_position(main_dofs, field, node);
        let normals = averaged_surface_normals(
            &self.rigid_mesh,
            &position,
            &self.node_to_elems,
            &all_rigid,
        );
        self.rigid_normals = normals;
        for (n, normal) in self.rigid_normals.iter_mut().enumerate() {
            if !normal.norm().is_finite() {
                log::warn!("rigid node {} has no adjacent surface element", n);
                *normal = Vector3::zeros();
            }
        }
    }

    /// Brute-force distance scan, one body node at a time (parallel over
    /// body nodes); optionally reduced to the k nearest by sorting
    pub(crate) fn search_neighbors(&mut self, main_dofs: usize, field: &[f64]) {
        let num_rigid = self.rigid_mesh.num_nodes();

        let neighbors: Vec<Vec<usize>> = self
            .body_nodes
            .par_iter()
            .map(|&body_node| {
                let x_body = Self::body_position(field, body_node);

                let mut found: Vec<(f64, usize)> = (0..num_rigid)
                    .filter_map(|rigid| {
                        let gap = self.rigid_position(main_dofs, field, rigid) - x_body;
                        let distance = gap.norm();
                        (distance <= self.search_radius).then_some((distance, rigid))
                    })
                    .collect();

                if let Some(k) = self.max_neighbors {
                    found.sort_by(|a, b| a.partial_cmp(b).unwrap());
                    found.truncate(k);
                }

                found.into_iter().map(|(_, rigid)| rigid).collect()
            })
            .collect();
        self.neighbors = neighbors;

        let total: usize = self.neighbors.iter().map(Vec::len).sum();
        log::debug!("contact neighbor search found {} pairs", total);
    }

    /// Reset the target minimum distance from the current average normal gap
    ///
    /// `constant` mode averages |gap . n| over all pairs into one shared
    /// value; otherwise each rigid node gets the signed average over the
    /// body nodes within its search radius.
    pub(crate) fn recompute_min_distance(&mut self, main_dofs: usize, field: &[f64], constant: bool) {
        if constant {
            let mut sum = 0.0;
            let mut count = 0usize;
            for (n, &body_node) in self.body_nodes.iter().enumerate() {
                let x_body = Self::body_position(field, body_node);
                for &rigid in &self.neighbors[n] {
                    let gap = self.rigid_position(main_dofs, field, rigid) - x_body;
                    sum += gap.dot(&self.rigid_normals[rigid]).abs();
                    count += 1;
                }
            }
            if count > 0 {
                let average = sum / count as f64;
                log::info!("resetting contact minimum distance to {:.3e}", average);
                self.min_distance_per_rigid.fill(average);
            }
        } else {
            for rigid in 0..self.rigid_mesh.num_nodes() {
                let x_rigid = self.rigid_position(main_dofs, field, rigid);
                let mut sum = 0.0;
                let mut count = 0usize;
                for &body_node in &self.body_nodes {
                    let gap = x_rigid - Self::body_position(field, body_node);
                    if gap.norm() <= self.search_radius {
                        sum += gap.dot(&self.rigid_normals[rigid]);
                        count += 1;
                    }
                }
                if count > 0 {
                    self.min_distance_per_rigid[rigid] = sum / count as f64;
                }
            }
        }
    }

    /// Accumulate the pair-potential contribution
    pub(crate) fn contribute(&self, main_dofs: usize, field: &[f64], r: &mut ModelResult) {
        let k = self.well_depth;

        for (n, &body_node) in self.body_nodes.iter().enumerate() {
            if self.neighbors[n].is_empty() {
                continue;
            }
            let share = 1.0 / self.neighbors[n].len() as f64;
            let x_body = Self::body_position(field, body_node);

            for &rigid in &self.neighbors[n] {
                let normal = self.rigid_normals[rigid];
                let gap = self.rigid_position(main_dofs, field, rigid) - x_body;
                let g = gap.dot(&normal) - self.min_distance_per_rigid[rigid];

                // Energy, residual scale, and stiffness scale per penalty form
                let (energy, res_scale, stiff_scale) = match self.kind {
                    PotentialKind::Quadratic => {
                        (0.5 * k * g * g, k * g, k)
                    }
                    PotentialKind::Quartic => {
                        (0.5 * k * g.powi(4), 2.0 * k * g.powi(3), 6.0 * k * g * g)
                    }
                };

                if r.request().contains(Request::ENERGY) {
                    r.add_energy(share * energy);
                }

                if r.request().contains(Request::FORCE) {
                    for i in 0..3 {
                        r.add_residual(body_node * 3 + i, -share * res_scale * normal[i]);
                        if self.is_flexible() {
                            r.add_residual(
                                main_dofs + rigid * 3 + i,
                                share * res_scale * normal[i],
                            );
                        }
                    }
                }

                if r.request().contains(Request::STIFFNESS) {
                    for i in 0..3 {
                        for j in 0..3 {
                            let block = share * stiff_scale * normal[i] * normal[j];
                            r.add_stiffness(body_node * 3 + i, body_node * 3 + j, block);
                            if self.is_flexible() {
                                let m_i = main_dofs + rigid * 3 + i;
                                let m_j = main_dofs + rigid * 3 + j;
                                r.add_stiffness(m_i, m_j, block);
                                r.add_stiffness(body_node * 3 + i, m_j, -block);
                                r.add_stiffness(m_i, body_node * 3 + j, -block);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Accumulate the membrane edge-spring contribution (flexible mode)
    ///
    /// 3-node patches carry their three edges; 6-node patches carry the six
    /// perimeter half-edges plus the three midside-to-midside edges, the
    /// latter double-weighted so midside nodes see equivalent stiffness.
    pub(crate) fn contribute_membrane(
        &self,
        main_dofs: usize,
        field: &[f64],
        r: &mut ModelResult,
    ) -> Result<()> {
        let stiffness = match self.membrane_stiffness {
            Some(k) => k,
            None => return Ok(()),
        };

        for element in self.rigid_mesh.elements() {
            let conn = element.nodes();
            // (local a, local b, stiffness factor)
            let edges: Vec<(usize, usize, f64)> = match conn.len() {
                3 => vec![(0, 1, 1.0), (1, 2, 1.0), (2, 0, 1.0)],
                6 => vec![
                    (0, 3, 1.0),
                    (3, 1, 1.0),
                    (1, 4, 1.0),
                    (4, 2, 1.0),
                    (2, 5, 1.0),
                    (5, 0, 1.0),
                    (3, 4, 2.0),
                    (4, 5, 2.0),
                    (5, 3, 2.0),
                ],
                nodes => {
                    return Err(SimError::UnsupportedTopology { dim: 2, nodes });
                }
            };

            for (a, b, factor) in edges {
                let k = stiffness * factor;
                let node_a = conn[a];
                let node_b = conn[b];

                let e_cur = self.rigid_position(main_dofs, field, node_a)
                    - self.rigid_position(main_dofs, field, node_b);
                let e_ref = self.rigid_mesh.x(node_a) - self.rigid_mesh.x(node_b);
                let len_cur = e_cur.norm();
                let len_ref = e_ref.norm();

                if r.request().contains(Request::ENERGY) {
                    r.add_energy(0.5 * k * (len_cur - len_ref) * (len_cur - len_ref));
                }

                if r.request().contains(Request::FORCE) {
                    for i in 0..3 {
                        let f_i = k * (e_cur[i] - len_ref * e_cur[i] / len_cur);
                        r.add_residual(main_dofs + node_a * 3 + i, f_i);
                        r.add_residual(main_dofs + node_b * 3 + i, -f_i);
                    }
                }

                if r.request().contains(Request::STIFFNESS) {
                    for i in 0..3 {
                        for j in 0..3 {
                            let delta = if i == j { 1.0 } else { 0.0 };
                            let block = k
                                * (delta
                                    - len_ref
                                        * (delta / len_cur
                                            - e_cur[i] * e_cur[j] / len_cur.powi(3)));
                            let dof_a = main_dofs + node_a * 3;
                            let dof_b = main_dofs + node_b * 3;
                            r.add_stiffness(dof_a + i, dof_a + j, block);
                            r.add_stiffness(dof_b + i, dof_b + j, block);
                            r.add_stiffness(dof_a + i, dof_b + j, -block);
                            r.add_stiffness(dof_b + i, dof_a + j, -block);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
