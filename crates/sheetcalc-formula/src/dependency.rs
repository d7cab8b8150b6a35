//! Dependency tracking for formula recalculation
//!
//! Answers "given a cell edit, which cells must be re-evaluated, and in what
//! order".

use crate::ast::FormulaExpr;
use crate::parser::parse_formula;
use ahash::{AHashMap, AHashSet};
use sheetcalc_core::{parse_reference, CellAddress, CellStore};
use std::collections::BTreeSet;

/// List every cell a formula reads, ranges expanded row-major
pub fn extract_references(expr: &FormulaExpr) -> Vec<CellAddress> {
    let mut refs = Vec::new();
    extract_references_recursive(expr, &mut refs);
    refs
}

fn extract_references_recursive(expr: &FormulaExpr, refs: &mut Vec<CellAddress>) {
    match expr {
        FormulaExpr::CellRef(addr) => refs.push(*addr),
        FormulaExpr::RangeRef(range) => refs.extend(range.cells()),
        FormulaExpr::BinaryOp { left, right, .. } => {
            extract_references_recursive(left, refs);
            extract_references_recursive(right, refs);
        }
        FormulaExpr::UnaryOp { operand, .. } => extract_references_recursive(operand, refs),
        FormulaExpr::Function { args, .. } => {
            for arg in args {
                extract_references_recursive(arg, refs);
            }
        }
        // Literals have no references
        FormulaExpr::Number(_)
        | FormulaExpr::String(_)
        | FormulaExpr::Boolean(_)
        | FormulaExpr::Error(_) => {}
    }
}

/// Dependency graph for formula cells
///
/// Tracks which cells depend on which other cells,
/// enabling targeted recalculation.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Cell → Cells that depend on it (dependents)
    dependents: AHashMap<CellAddress, BTreeSet<CellAddress>>,
    /// Cell → Cells it depends on (precedents)
    precedents: AHashMap<CellAddress, BTreeSet<CellAddress>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for every formula cell in a store
    ///
    /// Formulas that do not parse contribute no dependencies.
    pub fn from_store(cells: &dyn CellStore) -> Self {
        let mut graph = Self::new();
        for (addr, key) in cells.formula_cells() {
            let formula = cells.cell(&key).and_then(|cell| cell.formula.as_deref());
            if let Some(Ok(ast)) = formula.map(parse_formula) {
                graph.add_formula(addr, &ast);
            }
        }
        graph
    }

    /// Replace a formula cell's dependencies with those read by `expr`
    pub fn add_formula(&mut self, cell: CellAddress, expr: &FormulaExpr) {
        self.clear_precedents(cell);
        for precedent in extract_references(expr) {
            self.add_dependency(precedent, cell);
        }
    }

    /// Add a dependency: dependent depends on precedent
    pub fn add_dependency(&mut self, precedent: CellAddress, dependent: CellAddress) {
        self.dependents
            .entry(precedent)
            .or_default()
            .insert(dependent);
        self.precedents
            .entry(dependent)
            .or_default()
            .insert(precedent);
    }

    /// Remove the edges from a cell to the cells it reads
    fn clear_precedents(&mut self, cell: CellAddress) {
        if let Some(precedents) = self.precedents.remove(&cell) {
            for precedent in precedents {
                if let Some(deps) = self.dependents.get_mut(&precedent) {
                    deps.remove(&cell);
                }
            }
        }
    }

    /// Remove all dependencies for a cell
    pub fn clear_dependencies(&mut self, cell: CellAddress) {
        self.clear_precedents(cell);

        // Remove as a precedent for others
        if let Some(dependents) = self.dependents.remove(&cell) {
            for dependent in dependents {
                if let Some(precs) = self.precedents.get_mut(&dependent) {
                    precs.remove(&cell);
                }
            }
        }
    }

    /// Get cells that depend on the given cell
    pub fn get_dependents(&self, cell: CellAddress) -> impl Iterator<Item = CellAddress> + '_ {
        self.dependents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Get cells that the given cell depends on
    pub fn get_precedents(&self, cell: CellAddress) -> impl Iterator<Item = CellAddress> + '_ {
        self.precedents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// The changed cells and everything downstream of them, in evaluation order
    ///
    /// Every cell comes after the cells it reads, except inside a cycle, where
    /// the order is arbitrary.
    pub fn get_recalc_order(&self, changed: &[CellAddress]) -> Vec<CellAddress> {
        let mut result = Vec::new();
        let mut visited = AHashSet::new();

        for &cell in changed {
            self.topological_sort(cell, &mut result, &mut visited);
        }

        // Post-order puts dependents first
        result.reverse();
        result
    }

    /// Topological sort helper (DFS post-order, with an explicit stack)
    fn topological_sort(
        &self,
        root: CellAddress,
        result: &mut Vec<CellAddress>,
        visited: &mut AHashSet<CellAddress>,
    ) {
        if !visited.insert(root) {
            return;
        }

        let mut stack = vec![(root, self.get_dependents(root))];
        while let Some((cell, dependents)) = stack.last_mut() {
            // Visit all dependents first
            match dependents.find(|dependent| !visited.contains(dependent)) {
                Some(next) => {
                    visited.insert(next);
                    stack.push((next, self.get_dependents(next)));
                }
                None => {
                    result.push(*cell);
                    stack.pop();
                }
            }
        }
    }

    /// Cells that must be re-evaluated after the given cells change
    ///
    /// Transitive dependents only, in evaluation order. A changed cell is
    /// included only if it depends on itself through a cycle.
    pub fn cells_affected_by(&self, changed: &[CellAddress]) -> Vec<CellAddress> {
        let mut affected = AHashSet::new();
        let mut stack: Vec<CellAddress> = changed.to_vec();
        while let Some(cell) = stack.pop() {
            for dependent in self.get_dependents(cell) {
                if affected.insert(dependent) {
                    stack.push(dependent);
                }
            }
        }

        let mut order = self.get_recalc_order(changed);
        order.retain(|cell| affected.contains(cell));
        order
    }

    /// Cells affected by edits to the given keys; keys that are not references are ignored
    pub fn cells_affected_by_keys<S: AsRef<str>>(&self, changed: &[S]) -> Vec<CellAddress> {
        let changed: Vec<CellAddress> = changed
            .iter()
            .filter_map(|key| parse_reference(key.as_ref()))
            .collect();
        self.cells_affected_by(&changed)
    }

    /// Check whether a cell reaches itself through its precedents
    pub fn has_circular_reference(&self, cell: CellAddress) -> bool {
        let mut visited = AHashSet::new();
        let mut stack: Vec<CellAddress> = self.get_precedents(cell).collect();
        while let Some(current) = stack.pop() {
            if current == cell {
                return true;
            }
            if visited.insert(current) {
                stack.extend(self.get_precedents(current));
            }
        }
        false
    }

    /// Every cell that reaches itself through its references
    ///
    /// One pass of Tarjan's strongly connected components algorithm: a cell is
    /// circular when its component has more than one member or when it
    /// reads itself directly.
    pub fn circular_cells(&self) -> BTreeSet<CellAddress> {
        let mut index: AHashMap<CellAddress, usize> = AHashMap::new();
        let mut lowlink: Vec<usize> = Vec::new();
        let mut on_stack: AHashSet<CellAddress> = AHashSet::new();
        let mut component_stack: Vec<CellAddress> = Vec::new();
        let mut circular = BTreeSet::new();

        for &root in self.dependents.keys() {
            if index.contains_key(&root) {
                continue;
            }

            index.insert(root, lowlink.len());
            lowlink.push(lowlink.len());
            on_stack.insert(root);
            component_stack.push(root);
            let mut work = vec![(root, self.get_dependents(root))];

            while let Some((cell, dependents)) = work.last_mut() {
                let cell = *cell;
                let cell_index = index[&cell];

                if let Some(next) = dependents.next() {
                    match index.get(&next) {
                        None => {
                            index.insert(next, lowlink.len());
                            lowlink.push(lowlink.len());
                            on_stack.insert(next);
                            component_stack.push(next);
                            work.push((next, self.get_dependents(next)));
                        }
                        Some(&next_index) if on_stack.contains(&next) => {
                            lowlink[cell_index] = lowlink[cell_index].min(next_index);
                        }
                        Some(_) => {}
                    }
                    continue;
                }

                work.pop();
                if let Some((parent, _)) = work.last() {
                    let parent_index = index[parent];
                    lowlink[parent_index] = lowlink[parent_index].min(lowlink[cell_index]);
                }

                if lowlink[cell_index] == cell_index {
                    let mut component = Vec::new();
                    while let Some(member) = component_stack.pop() {
                        on_stack.remove(&member);
                        component.push(member);
                        if member == cell {
                            break;
                        }
                    }
                    let reads_itself = self
                        .dependents
                        .get(&cell)
                        .map_or(false, |dependents| dependents.contains(&cell));
                    if component.len() > 1 || reads_itself {
                        circular.extend(component);
                    }
                }
            }
        }

        circular
    }

    /// Clear the entire graph
    pub fn clear(&mut self) {
        self.dependents.clear();
        self.precedents.clear();
    }
}
