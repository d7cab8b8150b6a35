//! Sheet recalculation
//!
//! Re-evaluates formula cells and writes their display values back into a
//! [`Sheet`]. Two modes are available:
//!
//! - [`RecalcMode::FullScan`] evaluates every formula cell once against a
//!   snapshot of the sheet and writes back the values that changed. A cell
//!   reading another formula cell sees that cell's previous display value.
//! - [`RecalcMode::Dependents`] evaluates formula cells in dependency order,
//!   writing each result back before the next cell is evaluated, so chains
//!   settle in a single pass.
//!
//! # Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut sheet = Sheet::new();
//! sheet.set_input("A1", "10").unwrap();
//! sheet.set_input("A2", "=A1*2").unwrap();
//! sheet.set_input("A3", "=A2+1").unwrap();
//!
//! let options = CalculationOptions::dependents();
//! let stats = sheet.calculate_with_options(&options).unwrap();
//! assert_eq!(stats.cells_calculated, 2);
//! assert_eq!(sheet.text_of("A3"), "21");
//!
//! // Editing A1 only touches what reads it
//! let stats = sheet.commit_input("A1", "1", &options).unwrap();
//! assert_eq!(stats.cells_calculated, 2);
//! assert_eq!(sheet.text_of("A3"), "3");
//! ```

use crate::{
    evaluate_formula_with, parse_formula, CellAddress, CellError, CellStore, DependencyGraph,
    EvaluationSettings, Result, Sheet,
};
use std::collections::{BTreeMap, BTreeSet};

/// How a recalculation pass picks and orders the cells it evaluates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecalcMode {
    /// Evaluate every formula cell against a snapshot, in row-major order
    #[default]
    FullScan,
    /// Evaluate only affected cells, in dependency order, writing through
    Dependents,
}

/// Options for sheet calculation
#[derive(Debug, Clone, Default)]
pub struct CalculationOptions {
    /// Cell selection and ordering strategy
    pub mode: RecalcMode,
    /// Re-evaluate cells calling TODAY/NOW on every targeted pass
    ///
    /// Only consulted in [`RecalcMode::Dependents`]; a full scan evaluates
    /// everything anyway.
    pub calculate_volatile: bool,
    /// Date formats and clock used by TODAY/NOW
    pub settings: EvaluationSettings,
}

impl CalculationOptions {
    /// Options for a full scan with default settings
    pub fn full_scan() -> Self {
        Self::default()
    }

    /// Options for dependency-ordered recalculation with default settings
    pub fn dependents() -> Self {
        Self {
            mode: RecalcMode::Dependents,
            calculate_volatile: true,
            ..Self::default()
        }
    }

    /// Use the given evaluation settings
    pub fn with_settings(mut self, settings: EvaluationSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Statistics from a calculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Total number of formula cells in the sheet
    pub formula_count: usize,
    /// Number of cells evaluated
    pub cells_calculated: usize,
    /// Number of display values that changed
    pub cells_changed: usize,
    /// Number of evaluated cells whose display value is an error code
    pub errors: usize,
    /// Number of formula cells that reach themselves through their references
    ///
    /// Only counted in [`RecalcMode::Dependents`].
    pub circular_references: usize,
    /// Number of volatile cells evaluated
    pub volatile_cells: usize,
}

/// Extension trait for [`Sheet`] to add calculation methods
pub trait SheetCalculationExt {
    /// Recalculate every formula cell with default options
    fn calculate(&mut self) -> Result<CalculationStats>;

    /// Recalculate every formula cell with custom options
    fn calculate_with_options(&mut self, options: &CalculationOptions) -> Result<CalculationStats>;

    /// Recalculate after the given cells were edited
    ///
    /// A full scan ignores `changed` and evaluates everything. Dependency mode
    /// evaluates the changed formula cells, their transitive dependents and,
    /// if enabled, volatile cells.
    fn recalculate_after(
        &mut self,
        changed: &[&str],
        options: &CalculationOptions,
    ) -> Result<CalculationStats>;

    /// Commit raw input to a cell and recalculate what it affects
    fn commit_input(
        &mut self,
        key: &str,
        raw: &str,
        options: &CalculationOptions,
    ) -> Result<CalculationStats>;

    /// Keys of the formula cells that must be re-evaluated after the given cells change
    ///
    /// Transitive dependents only, in evaluation order.
    fn affected_cells(&self, changed: &[&str]) -> Vec<String>;
}

impl SheetCalculationExt for Sheet {
    fn calculate(&mut self) -> Result<CalculationStats> {
        self.calculate_with_options(&CalculationOptions::default())
    }

    fn calculate_with_options(&mut self, options: &CalculationOptions) -> Result<CalculationStats> {
        let mut engine = CalculationEngine::new(options.clone());
        engine.calculate_all(self)
    }

    fn recalculate_after(
        &mut self,
        changed: &[&str],
        options: &CalculationOptions,
    ) -> Result<CalculationStats> {
        let mut engine = CalculationEngine::new(options.clone());
        match options.mode {
            RecalcMode::FullScan => engine.calculate_all(self),
            RecalcMode::Dependents => {
                let changed: Vec<CellAddress> = changed
                    .iter()
                    .map(|key| CellAddress::parse(key))
                    .collect::<Result<_>>()?;
                engine.calculate_changed(self, &changed)
            }
        }
    }

    fn commit_input(
        &mut self,
        key: &str,
        raw: &str,
        options: &CalculationOptions,
    ) -> Result<CalculationStats> {
        self.set_input(key, raw)?;
        self.recalculate_after(&[key], options)
    }

    fn affected_cells(&self, changed: &[&str]) -> Vec<String> {
        let formulas: BTreeSet<CellAddress> =
            self.formula_cells().into_iter().map(|(addr, _)| addr).collect();
        DependencyGraph::from_store(self)
            .cells_affected_by_keys(changed)
            .into_iter()
            .filter(|addr| formulas.contains(addr))
            .map(|addr| addr.to_a1_string())
            .collect()
    }
}

/// The calculation engine
struct CalculationEngine {
    options: CalculationOptions,
    /// Dependency graph built from formulas
    dependency_graph: DependencyGraph,
    /// Formula text of every formula cell, row-major
    formulas: BTreeMap<CellAddress, String>,
    /// Cells calling TODAY/NOW
    volatile_cells: BTreeSet<CellAddress>,
    /// Cells involved in circular references
    circular_cells: BTreeSet<CellAddress>,
}

impl CalculationEngine {
    fn new(options: CalculationOptions) -> Self {
        Self {
            options,
            dependency_graph: DependencyGraph::new(),
            formulas: BTreeMap::new(),
            volatile_cells: BTreeSet::new(),
            circular_cells: BTreeSet::new(),
        }
    }

    /// Recalculate every formula cell
    fn calculate_all(&mut self, sheet: &mut Sheet) -> Result<CalculationStats> {
        let mut stats = CalculationStats::default();

        // Phase 1: Collect and parse all formulas
        self.collect_formulas(sheet, &mut stats);

        if stats.formula_count == 0 {
            return Ok(stats);
        }

        // Phase 2: Calculate. A snapshot pass reads previous values, so a
        // cycle cannot loop and needs no graph.
        match self.options.mode {
            RecalcMode::FullScan => self.calculate_snapshot(sheet, &mut stats)?,
            RecalcMode::Dependents => {
                self.detect_circular_references();
                stats.circular_references = self.circular_cells.len();

                let seeds: Vec<CellAddress> = self.formulas.keys().copied().collect();
                let order = self.get_calculation_order(&seeds);
                self.calculate_in_order(sheet, &order, &mut stats)?;
            }
        }

        log::debug!(
            "Full recalculation ({:?}): {} of {} formula cells changed, {} errors",
            self.options.mode,
            stats.cells_changed,
            stats.formula_count,
            stats.errors
        );
        Ok(stats)
    }

    /// Recalculate the cells affected by an edit
    fn calculate_changed(
        &mut self,
        sheet: &mut Sheet,
        changed: &[CellAddress],
    ) -> Result<CalculationStats> {
        let mut stats = CalculationStats::default();

        self.collect_formulas(sheet, &mut stats);

        if stats.formula_count == 0 {
            return Ok(stats);
        }

        self.detect_circular_references();
        stats.circular_references = self.circular_cells.len();

        let mut seeds = changed.to_vec();
        if self.options.calculate_volatile {
            seeds.extend(self.volatile_cells.iter().copied());
        }
        let order = self.get_calculation_order(&seeds);
        self.calculate_in_order(sheet, &order, &mut stats)?;

        log::debug!(
            "Recalculated {} cells after {} edits ({} changed, {} errors)",
            stats.cells_calculated,
            changed.len(),
            stats.cells_changed,
            stats.errors
        );
        Ok(stats)
    }

    /// Collect formula text, and build the dependency graph when ordering by it
    fn collect_formulas(&mut self, sheet: &Sheet, stats: &mut CalculationStats) {
        let build_graph = self.options.mode == RecalcMode::Dependents;
        for (addr, key) in sheet.formula_cells() {
            let Some(formula) = sheet.get(&key).and_then(|cell| cell.formula.clone()) else {
                continue;
            };

            // Unparseable formulas still get evaluated (to an error code or
            // through the arithmetic fallback) but have no dependencies
            if let Ok(ast) = parse_formula(&formula) {
                if build_graph {
                    self.dependency_graph.add_formula(addr, &ast);
                }
                if ast.is_volatile() {
                    self.volatile_cells.insert(addr);
                }
            }

            self.formulas.insert(addr, formula);
            stats.formula_count += 1;
        }
    }

    /// Detect cells that reach themselves through their references
    fn detect_circular_references(&mut self) {
        self.circular_cells = self.dependency_graph.circular_cells();
        self.circular_cells.retain(|addr| self.formulas.contains_key(addr));
        for addr in &self.circular_cells {
            log::warn!("Circular reference detected at {}", addr);
        }
    }

    /// Formula cells to evaluate, in dependency order
    fn get_calculation_order(&self, seeds: &[CellAddress]) -> Vec<CellAddress> {
        let mut order = self.dependency_graph.get_recalc_order(seeds);
        order.retain(|addr| self.formulas.contains_key(addr));
        order
    }

    /// Evaluate every formula against the same snapshot, then write back
    fn calculate_snapshot(&self, sheet: &mut Sheet, stats: &mut CalculationStats) -> Result<()> {
        let results: Vec<(CellAddress, String)> = self
            .formulas
            .iter()
            .map(|(&addr, formula)| {
                let display = evaluate_formula_with(
                    formula,
                    &addr.to_a1_string(),
                    &*sheet,
                    &self.options.settings,
                );
                (addr, display)
            })
            .collect();

        for (addr, display) in results {
            self.record(sheet, addr, &display, stats)?;
        }
        Ok(())
    }

    /// Evaluate cells one at a time, each seeing the results written before it
    fn calculate_in_order(
        &self,
        sheet: &mut Sheet,
        order: &[CellAddress],
        stats: &mut CalculationStats,
    ) -> Result<()> {
        for &addr in order {
            let Some(formula) = self.formulas.get(&addr) else {
                continue;
            };
            let display =
                evaluate_formula_with(formula, &addr.to_a1_string(), &*sheet, &self.options.settings);
            self.record(sheet, addr, &display, stats)?;
        }
        Ok(())
    }

    fn record(
        &self,
        sheet: &mut Sheet,
        addr: CellAddress,
        display: &str,
        stats: &mut CalculationStats,
    ) -> Result<()> {
        stats.cells_calculated += 1;
        if CellError::from_str(display).is_some() {
            stats.errors += 1;
        }
        if self.volatile_cells.contains(&addr) {
            stats.volatile_cells += 1;
        }
        if sheet.set_display_value(&addr.to_a1_string(), display)? {
            log::trace!("{} = {}", addr, display);
            stats.cells_changed += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sheet(cells: &[(&str, &str)]) -> Sheet {
        cells.iter().copied().collect()
    }

    #[test]
    fn test_simple_calculation() {
        let mut sheet = sheet(&[("A1", "10"), ("A2", "20"), ("A3", "=A1+A2")]);

        let stats = sheet.calculate().unwrap();

        assert_eq!(stats.formula_count, 1);
        assert_eq!(stats.cells_calculated, 1);
        assert_eq!(stats.cells_changed, 1);
        assert_eq!(sheet.text_of("A3"), "30");
    }

    #[test]
    fn test_chain_calculation() {
        let mut sheet = sheet(&[
            ("A1", "5"),
            ("A2", "=A1*2"),
            ("A3", "=A2+10"),
            ("A4", "=A3*A1"),
        ]);

        let stats = sheet
            .calculate_with_options(&CalculationOptions::dependents())
            .unwrap();

        assert_eq!(stats.formula_count, 3);
        assert_eq!(sheet.text_of("A2"), "10");
        assert_eq!(sheet.text_of("A3"), "20");
        assert_eq!(sheet.text_of("A4"), "100");
    }

    #[test]
    fn test_full_scan_reads_previous_values() {
        // A1 comes first in row-major order and reads B1 before it has a result
        let mut sheet = sheet(&[("A1", "=B1+1"), ("B1", "=5")]);

        sheet.calculate().unwrap();
        assert_eq!(sheet.text_of("B1"), "5");
        assert_eq!(sheet.text_of("A1"), "1");

        // The next pass settles
        let stats = sheet.calculate().unwrap();
        assert_eq!(sheet.text_of("A1"), "6");
        assert_eq!(stats.cells_changed, 1);
    }

    #[test]
    fn test_unchanged_values_are_not_counted() {
        let mut sheet = sheet(&[("A1", "2"), ("B1", "=A1*3")]);
        assert_eq!(sheet.calculate().unwrap().cells_changed, 1);

        let stats = sheet.calculate().unwrap();
        assert_eq!(stats.cells_calculated, 1);
        assert_eq!(stats.cells_changed, 0);
    }

    #[test]
    fn test_recalculate_after_edit() {
        let options = CalculationOptions::dependents();
        let mut sheet = sheet(&[
            ("A1", "1"),
            ("A2", "=A1+1"),
            ("B1", "7"),
            ("B2", "=B1*2"),
        ]);
        sheet.calculate_with_options(&options).unwrap();

        let stats = sheet.commit_input("A1", "41", &options).unwrap();
        assert_eq!(stats.cells_calculated, 1);
        assert_eq!(sheet.text_of("A2"), "42");
        assert_eq!(sheet.text_of("B2"), "14");
    }

    #[test]
    fn test_commit_formula_evaluates_itself() {
        let options = CalculationOptions::dependents();
        let mut sheet = sheet(&[("A1", "3"), ("B1", "=C1*2")]);
        sheet.calculate_with_options(&options).unwrap();

        sheet.commit_input("C1", "=A1+1", &options).unwrap();
        assert_eq!(sheet.text_of("C1"), "4");
        assert_eq!(sheet.text_of("B1"), "8");
    }

    #[test]
    fn test_commit_plain_value_over_formula() {
        let options = CalculationOptions::dependents();
        let mut sheet = sheet(&[("A1", "=1+1"), ("B1", "=A1*10")]);
        sheet.calculate_with_options(&options).unwrap();
        assert_eq!(sheet.text_of("B1"), "20");

        sheet.commit_input("A1", "5", &options).unwrap();
        assert_eq!(sheet.get("A1").unwrap().display_value, None);
        assert_eq!(sheet.text_of("B1"), "50");
    }

    #[test]
    fn test_volatile_cells_recalculate() {
        use chrono::NaiveDate;

        let at = NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap();
        let options = CalculationOptions::dependents()
            .with_settings(EvaluationSettings::default().with_fixed_clock(at));

        let mut sheet = sheet(&[("A1", "1"), ("B1", "=TODAY()"), ("C1", "=A1+1")]);
        sheet.calculate_with_options(&options).unwrap();
        assert_eq!(sheet.text_of("B1"), "3/5/2024");

        let stats = sheet.recalculate_after(&["A1"], &options).unwrap();
        assert_eq!(stats.volatile_cells, 1);
        assert_eq!(stats.cells_calculated, 2);

        let options = CalculationOptions {
            calculate_volatile: false,
            ..options
        };
        let stats = sheet.recalculate_after(&["A1"], &options).unwrap();
        assert_eq!(stats.volatile_cells, 0);
        assert_eq!(stats.cells_calculated, 1);
    }

    #[test]
    fn test_circular_reference_terminates() {
        let mut sheet = sheet(&[("A1", "=B1+1"), ("B1", "=A1+1"), ("C1", "=5")]);

        let stats = sheet
            .calculate_with_options(&CalculationOptions::dependents())
            .unwrap();

        assert_eq!(stats.circular_references, 2);
        assert_eq!(stats.cells_calculated, 3);
        assert_eq!(sheet.text_of("C1"), "5");
    }

    #[test]
    fn test_full_scan_tolerates_circular_references() {
        let mut sheet = sheet(&[("A1", "=B1+1"), ("B1", "=A1+1")]);

        // Each cell reads the other's value from before the pass
        let stats = sheet.calculate().unwrap();
        assert_eq!(stats.circular_references, 0);
        assert_eq!(stats.cells_calculated, 2);
        assert_eq!(stats.errors, 0);
        assert_eq!(sheet.text_of("A1"), "1");
        assert_eq!(sheet.text_of("B1"), "1");

        sheet.calculate().unwrap();
        assert_eq!(sheet.text_of("A1"), "2");
        assert_eq!(sheet.text_of("B1"), "2");
    }

    #[test]
    fn test_long_dependency_chain() {
        let mut cells = vec![("A1".to_string(), "1".to_string())];
        for row in 2..=5000 {
            cells.push((format!("A{}", row), format!("=A{}+1", row - 1)));
        }
        let mut sheet: Sheet = cells.into_iter().collect();

        let stats = sheet
            .calculate_with_options(&CalculationOptions::dependents())
            .unwrap();
        assert_eq!(stats.cells_calculated, 4999);
        assert_eq!(stats.circular_references, 0);
        assert_eq!(sheet.text_of("A5000"), "5000");
    }

    #[test]
    fn test_errors_are_counted() {
        let mut sheet = sheet(&[("A1", "=1/0"), ("A2", "=FOO(1)"), ("A3", "=1+1")]);

        let stats = sheet.calculate().unwrap();
        assert_eq!(stats.errors, 2);
        assert_eq!(sheet.text_of("A1"), "#ERROR!");
        assert_eq!(sheet.text_of("A2"), "#NAME?");
    }

    #[test]
    fn test_affected_cells() {
        let sheet = sheet(&[
            ("A1", "1"),
            ("A2", "=A1+1"),
            ("A3", "=A2+1"),
            ("B1", "=SUM(A1:A3)"),
            ("C1", "=7"),
        ]);

        let affected = sheet.affected_cells(&["A1"]);
        assert_eq!(affected.len(), 3);
        let pos = |k: &str| affected.iter().position(|a| a == k).unwrap();
        assert!(pos("A2") < pos("A3"));
        assert!(pos("A3") < pos("B1"));
        assert!(!affected.contains(&"C1".to_string()));
    }

    #[test]
    fn test_recalculate_after_rejects_bad_key() {
        let mut sheet = sheet(&[("A1", "=1")]);
        assert!(sheet
            .recalculate_after(&["??"], &CalculationOptions::dependents())
            .is_err());
    }
}
