use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::connectivity::{CellState, ConnectivityMap, Point};

/// Offsets of the 8-connected neighborhood.
const NEIGHBORS: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, 1),
    (0, -1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

/// A discovered cell: its position and the arena index of the cell it was
/// reached from. The arena owns every node of one search; parents are plain
/// indices, so the whole ancestry drops with the search.
#[derive(Copy, Clone, Debug)]
struct SearchNode {
    point: Point,
    parent: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathResult {
    /// Ordered start-to-goal, both inclusive.
    pub path: Vec<Point>,
    pub start: Point,
    pub goal: Point,
    /// Hop count, `path.len() - 1`.
    pub steps: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchState {
    Computing,
    NoPathFound,
    PathFound(PathResult),
}

impl SearchState {
    fn is_done(&self) -> bool {
        !matches!(self, SearchState::Computing)
    }
}

/// Breadth-first search over a [`ConnectivityMap`], 8-connected, with a FIFO
/// frontier: the first dequeued cell in the goal column closes the shortest
/// hop-count path.
#[derive(Debug)]
pub struct PathSearch {
    start: Point,
    goal_column: usize,
    arena: Vec<SearchNode>,
    queue: VecDeque<usize>,
    state: SearchState,
}

impl PathSearch {
    /// Set up a search from `start` toward any cell with `x == goal_column`.
    /// The start cell is claimed here; if it cannot be claimed there is
    /// nothing to search.
    pub fn new(start: Point, goal_column: usize, map: &mut ConnectivityMap) -> Self {
        let state = if map.claim(start) {
            SearchState::Computing
        } else {
            SearchState::NoPathFound
        };

        Self {
            start,
            goal_column,
            arena: vec![SearchNode {
                point: start,
                parent: None,
            }],
            queue: VecDeque::from([0]),
            state,
        }
    }

    pub fn finish(mut self, map: &mut ConnectivityMap) -> SearchState {
        loop {
            match self.step(map) {
                SearchState::Computing => {}
                s => return s,
            }
        }
    }

    pub fn step(&mut self, map: &mut ConnectivityMap) -> SearchState {
        if self.state.is_done() {
            return self.state.clone();
        }
        if let Some(index) = self.queue.pop_front() {
            let node = self.arena[index];

            if node.point.x == self.goal_column {
                let path = self.backtrack(index);
                self.state = SearchState::PathFound(PathResult {
                    start: self.start,
                    goal: node.point,
                    steps: path.len() - 1,
                    path,
                });
                return self.state.clone();
            }

            for (dx, dy) in NEIGHBORS {
                let x = node.point.x as isize + dx;
                let y = node.point.y as isize + dy;
                if x < 0 || y < 0 || x as usize >= map.columns() || y as usize >= map.rows() {
                    continue;
                }
                let next = Point {
                    x: x as usize,
                    y: y as usize,
                };
                // claiming flips Available -> Processed exactly once, so a
                // cell can never be enqueued twice
                if map.claim(next) {
                    self.arena.push(SearchNode {
                        point: next,
                        parent: Some(index),
                    });
                    self.queue.push_back(self.arena.len() - 1);
                }
            }
        } else {
            self.state = SearchState::NoPathFound;
        }

        self.state.clone()
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Walk the parent indices from the goal back to the root, then reverse
    /// into start-to-goal order.
    fn backtrack(&self, goal_index: usize) -> Vec<Point> {
        let mut path = Vec::new();
        let mut current = Some(goal_index);
        while let Some(index) = current {
            let node = self.arena[index];
            path.push(node.point);
            current = node.parent;
        }
        path.reverse();
        path
    }
}

/// Scan `column` top to bottom for the first walkable cell.
pub fn discover_start(map: &ConnectivityMap, column: usize) -> Option<Point> {
    (0..map.rows())
        .map(|y| Point { x: column, y })
        .find(|&p| map.state(p) != CellState::Blocked)
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::grid::PixelGrid;

    fn corridor_map(rows: usize, columns: usize, walkable: &[(usize, usize)]) -> ConnectivityMap {
        let mut mask = PixelGrid::filled(rows, columns, 0);
        for &(x, y) in walkable {
            mask.set(y, x, 255);
        }
        ConnectivityMap::from_mask(&mask)
    }

    fn open_interior_map(rows: usize, columns: usize) -> ConnectivityMap {
        let mut mask = PixelGrid::filled(rows, columns, 255);
        mask.fill_border(1, 0);
        ConnectivityMap::from_mask(&mask)
    }

    #[test]
    fn test_straight_corridor_is_shortest() {
        // 5x7 with a fully open interior: 5 cells from x=1 to x=5
        let mut map = open_interior_map(5, 7);
        let start = Point { x: 1, y: 2 };

        let state = PathSearch::new(start, 5, &mut map).finish(&mut map);
        match state {
            SearchState::PathFound(result) => {
                assert_eq!(result.path.len(), 5);
                assert_eq!(result.steps, 4);
                assert_eq!(result.path[0], start);
                assert_eq!(result.path.last().unwrap().x, 5);
            }
            other => panic!("expected a path, got {:?}", other),
        }
    }

    #[test]
    fn test_diagonal_steps_count_as_one_hop() {
        // start and goal on different rows: 8-connectivity covers the
        // vertical offset for free
        let mut map = open_interior_map(7, 7);
        let start = Point { x: 1, y: 1 };

        let state = PathSearch::new(start, 5, &mut map).finish(&mut map);
        match state {
            SearchState::PathFound(result) => {
                assert_eq!(result.steps, 4);
            }
            other => panic!("expected a path, got {:?}", other),
        }
    }

    #[test]
    fn test_no_route_exhausts_queue() {
        let map_cells: Vec<(usize, usize)> = (1..4).map(|y| (1, y)).collect();
        let mut map = corridor_map(5, 8, &map_cells);

        let state = PathSearch::new(Point { x: 1, y: 1 }, 6, &mut map).finish(&mut map);
        assert!(matches!(state, SearchState::NoPathFound));
    }

    #[test]
    fn test_blocked_start_finds_nothing() {
        let mut map = corridor_map(5, 8, &[(2, 2)]);
        let state = PathSearch::new(Point { x: 1, y: 1 }, 6, &mut map).finish(&mut map);
        assert!(matches!(state, SearchState::NoPathFound));
    }

    #[test]
    fn test_discover_start_takes_first_walkable_row() {
        let mut map = corridor_map(6, 6, &[(1, 3), (1, 4)]);
        assert_eq!(discover_start(&map, 1), Some(Point { x: 1, y: 3 }));
        assert_eq!(discover_start(&map, 2), None);

        // claimed cells still count as walkable for discovery
        assert!(map.claim(Point { x: 1, y: 3 }));
        assert_eq!(discover_start(&map, 1), Some(Point { x: 1, y: 3 }));
    }
}
