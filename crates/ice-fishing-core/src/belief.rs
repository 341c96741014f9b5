//! Per-fisher spatial belief: three evidence layers and their fusion into a
//! posterior over grid cells.
//!
//! Layers are dense row-major `f64` grids the size of the lake:
//!
//! * `prior`  - a distribution seeded from assumed resource locations.
//! * `social` - a bounded likelihood stamped around peers that are fishing.
//! * `catch`  - a distribution built from observed catch rates.
//!
//! Two fusion strategies produce the posterior `belief`: an elementwise
//! product (Bayes update with a positive floor per layer) or a weighted linear
//! combination optionally sharpened by a temperature-scaled softmax.

use crate::spatial::{Cell, FieldError, Grid};

/// Relative tolerance used when collecting tied maxima.
const TIE_TOLERANCE: f64 = 1e-12;

pub const DEFAULT_BELIEF_FLOOR: f64 = 1e-5;

/// A dense non-negative field over the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct BeliefField {
    grid: Grid,
    data: Vec<f64>,
}

impl BeliefField {
    pub fn zeros(width: usize, height: usize) -> Self {
        let grid = Grid::new(width, height);
        Self {
            grid,
            data: vec![0.0; grid.cell_count()],
        }
    }

    /// Uniform distribution over every cell.
    pub fn uniform(width: usize, height: usize) -> Self {
        let mut field = Self::zeros(width, height);
        let n = field.data.len();
        if n > 0 {
            field.data.fill(1.0 / n as f64);
        }
        field
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, cell: Cell) -> Result<f64, FieldError> {
        self.grid.check(cell)?;
        Ok(self.data[self.grid.index(cell)])
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Set every cell within Euclidean `radius` of `center` to `value`.
    /// Returns the number of cells stamped.
    pub fn stamp_disk(
        &mut self,
        center: Cell,
        radius: i32,
        value: f64,
    ) -> Result<usize, FieldError> {
        self.apply_disk(center, radius, |cell| *cell = value)
    }

    /// Add `value` to every cell within Euclidean `radius` of `center`.
    pub fn accumulate_disk(
        &mut self,
        center: Cell,
        radius: i32,
        value: f64,
    ) -> Result<usize, FieldError> {
        self.apply_disk(center, radius, |cell| *cell += value)
    }

    fn apply_disk(
        &mut self,
        center: Cell,
        radius: i32,
        mut apply: impl FnMut(&mut f64),
    ) -> Result<usize, FieldError> {
        if radius <= 0 {
            return Err(FieldError::NonPositiveRadius(radius));
        }
        self.grid.check(center)?;
        let r_sq = radius as i64 * radius as i64;
        let y_lo = center[1].saturating_sub(radius).max(0);
        let y_hi = center[1].saturating_add(radius).min(self.grid.height as i32 - 1);
        let x_lo = center[0].saturating_sub(radius).max(0);
        let x_hi = center[0].saturating_add(radius).min(self.grid.width as i32 - 1);

        let mut stamped = 0;
        for y in y_lo..=y_hi {
            let dy = (y - center[1]) as i64;
            for x in x_lo..=x_hi {
                let dx = (x - center[0]) as i64;
                if dx * dx + dy * dy <= r_sq {
                    let idx = self.grid.index([x, y]);
                    apply(&mut self.data[idx]);
                    stamped += 1;
                }
            }
        }
        Ok(stamped)
    }

    /// Scale to unit mass. A field with zero (or non-finite) mass is left
    /// untouched and `false` is returned.
    pub fn normalize(&mut self) -> bool {
        let total = self.sum();
        if !(total.is_finite() && total > 0.0) {
            return false;
        }
        for v in &mut self.data {
            *v /= total;
        }
        true
    }

    pub fn max_value(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Every cell tied for the maximum, in row-major order.
    pub fn maxima(&self) -> Vec<Cell> {
        let max = self.max_value();
        if !max.is_finite() {
            return Vec::new();
        }
        let tolerance = max.abs() * TIE_TOLERANCE;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &v)| (max - v) <= tolerance)
            .map(|(idx, _)| self.grid.cell_at(idx))
            .collect()
    }

    /// First maximum in row-major order.
    pub fn argmax(&self) -> Option<Cell> {
        self.maxima().into_iter().next()
    }
}

/// How the three layers are combined into the posterior.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FusionStrategy {
    /// posterior ∝ (prior + floor)(social + floor)(catch + floor)
    Bayes { floor: f64 },
    /// posterior = normalize(w0·prior + w1·social + w2·catch), then an
    /// optional softmax at `temperature`.
    Softmax {
        weights: [f64; 3],
        temperature: Option<f64>,
    },
}

impl Default for FusionStrategy {
    fn default() -> Self {
        FusionStrategy::Bayes {
            floor: DEFAULT_BELIEF_FLOOR,
        }
    }
}

/// Belief state owned by a single fisher.
#[derive(Clone, Debug)]
pub struct BeliefModel {
    prior: BeliefField,
    social: BeliefField,
    catch: BeliefField,
    belief: BeliefField,
}

impl BeliefModel {
    /// Uniform prior, empty social and catch evidence.
    pub fn new(width: usize, height: usize) -> Self {
        let prior = BeliefField::uniform(width, height);
        Self {
            belief: prior.clone(),
            prior,
            social: BeliefField::zeros(width, height),
            catch: BeliefField::zeros(width, height),
        }
    }

    /// Model seeded with a prior around `locations`.
    pub fn with_prior(
        width: usize,
        height: usize,
        locations: &[Cell],
        radius: i32,
    ) -> Result<Self, FieldError> {
        let mut model = Self::new(width, height);
        model.update_prior(locations, radius)?;
        model.belief = model.prior.clone();
        Ok(model)
    }

    pub fn grid(&self) -> Grid {
        self.prior.grid()
    }

    pub fn prior(&self) -> &BeliefField {
        &self.prior
    }

    pub fn social(&self) -> &BeliefField {
        &self.social
    }

    pub fn catch(&self) -> &BeliefField {
        &self.catch
    }

    /// Most recently fused posterior.
    pub fn belief(&self) -> &BeliefField {
        &self.belief
    }

    /// Rebuild the prior as unit disks around `locations`, normalized.
    /// An empty location list yields a uniform prior.
    pub fn update_prior(&mut self, locations: &[Cell], radius: i32) -> Result<(), FieldError> {
        if radius <= 0 {
            return Err(FieldError::NonPositiveRadius(radius));
        }
        let grid = self.grid();
        if locations.is_empty() {
            self.prior = BeliefField::uniform(grid.width, grid.height);
            return Ok(());
        }
        let mut prior = BeliefField::zeros(grid.width, grid.height);
        for &loc in locations {
            prior.stamp_disk(loc, radius, 1.0)?;
        }
        prior.normalize();
        self.prior = prior;
        Ok(())
    }

    /// Replace the social layer with disks of `weight` around each fishing peer.
    pub fn update_social(
        &mut self,
        peer_locations: &[Cell],
        radius: i32,
        weight: f64,
    ) -> Result<(), FieldError> {
        if radius <= 0 {
            return Err(FieldError::NonPositiveRadius(radius));
        }
        let grid = self.grid();
        let mut social = BeliefField::zeros(grid.width, grid.height);
        for &loc in peer_locations {
            social.stamp_disk(loc, radius, weight)?;
        }
        self.social = social;
        Ok(())
    }

    /// Replace the catch layer with accumulated disks of each observed rate,
    /// normalized when any mass was observed.
    pub fn update_catch(
        &mut self,
        locations: &[Cell],
        rates: &[f64],
        radius: i32,
    ) -> Result<(), FieldError> {
        if locations.len() != rates.len() {
            return Err(FieldError::ObservationMismatch {
                locations: locations.len(),
                rates: rates.len(),
            });
        }
        if radius <= 0 {
            return Err(FieldError::NonPositiveRadius(radius));
        }
        let grid = self.grid();
        let mut catch = BeliefField::zeros(grid.width, grid.height);
        for (&loc, &rate) in locations.iter().zip(rates) {
            catch.accumulate_disk(loc, radius, rate.max(0.0))?;
        }
        catch.normalize();
        self.catch = catch;
        Ok(())
    }

    /// Multiplicative Bayes fusion with a positive floor on every layer.
    pub fn update_belief(&mut self, floor: f64) -> &BeliefField {
        let mut belief = self.prior.clone();
        for (((b, &p), &s), &c) in belief
            .data
            .iter_mut()
            .zip(&self.prior.data)
            .zip(&self.social.data)
            .zip(&self.catch.data)
        {
            *b = (p + floor) * (s + floor) * (c + floor);
        }
        belief.normalize();
        self.belief = belief;
        &self.belief
    }

    /// Weighted linear fusion, normalized, optionally passed through a softmax.
    pub fn softmax_weighted_belief(
        &mut self,
        weights: [f64; 3],
        temperature: Option<f64>,
    ) -> &BeliefField {
        let mut belief = self.prior.clone();
        for (((b, &p), &s), &c) in belief
            .data
            .iter_mut()
            .zip(&self.prior.data)
            .zip(&self.social.data)
            .zip(&self.catch.data)
        {
            *b = weights[0] * p + weights[1] * s + weights[2] * c;
        }
        let normalized = belief.normalize();
        if let (true, Some(t)) = (normalized, temperature) {
            softmax_in_place(&mut belief.data, t);
        }
        self.belief = belief;
        &self.belief
    }

    pub fn fuse(&mut self, strategy: FusionStrategy) -> &BeliefField {
        match strategy {
            FusionStrategy::Bayes { floor } => self.update_belief(floor),
            FusionStrategy::Softmax {
                weights,
                temperature,
            } => self.softmax_weighted_belief(weights, temperature),
        }
    }
}

fn softmax_in_place(values: &mut [f64], temperature: f64) {
    debug_assert!(temperature > 0.0, "temperature must be positive");
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for v in values.iter_mut() {
        *v = ((*v - max) / temperature).exp();
        total += *v;
    }
    if total > 0.0 {
        for v in values.iter_mut() {
            *v /= total;
        }
    }
}
