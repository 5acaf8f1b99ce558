//! Temperature of the simulated surface

use crate::Precision;
use ndarray::Array2;

/// Temperature grid
pub type Temperature = Array2<Precision>;

/// Pair of temperature grids where one acts as an input and the other as an
/// output for the current simulation round
///
/// Boundary rows and columns hold fixed boundary-condition values and are
/// never written during a run, so both grids are seeded with the full loaded
/// state and only interior cells ever diverge.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface([Temperature; 2]);
//
impl Surface {
    /// Set up surface storage from an initial temperature grid
    pub fn new(initial: Temperature) -> Self {
        Self([initial.clone(), initial])
    }

    /// Grid side length
    pub fn side(&self) -> usize {
        self.0[0].nrows()
    }

    /// Access the input temperature
    pub fn input(&self) -> &Temperature {
        &self.0[0]
    }

    /// Access the input and output temperatures
    pub fn inout(&mut self) -> (&Temperature, &mut Temperature) {
        let [input, output] = &mut self.0;
        (input, output)
    }

    /// Make the output temperature become the input one
    pub fn flip(&mut self) {
        let [input, output] = &mut self.0;
        std::mem::swap(input, output);
    }

    /// Tear the surface apart into its two grids
    pub fn into_buffers(self) -> [Temperature; 2] {
        self.0
    }
}
