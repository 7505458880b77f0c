//! Fixed-size cell grid.

use protocol::{Direction, Position, WormId};

/// Contents of one grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell {
    /// Worm whose body covers this cell.
    pub occupant: Option<WormId>,
    pub food: bool,
}

/// Dense `width x height` grid, stored column-major (`x * height + y`).
///
/// Coordinates must be in range; out-of-range access panics.
#[derive(Debug, Clone)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width as usize * height as usize],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    #[inline]
    fn index(&self, pos: Position) -> usize {
        debug_assert!(self.contains(pos), "{pos} outside {}x{} grid", self.width, self.height);
        pos.x as usize * self.height as usize + pos.y as usize
    }

    #[inline]
    pub fn cell(&self, pos: Position) -> &Cell {
        &self.cells[self.index(pos)]
    }

    #[inline]
    pub fn set_occupant(&mut self, pos: Position, occupant: Option<WormId>) {
        let i = self.index(pos);
        self.cells[i].occupant = occupant;
    }

    #[inline]
    pub fn set_food(&mut self, pos: Position, food: bool) {
        let i = self.index(pos);
        self.cells[i].food = food;
    }

    /// Neither food nor a worm on the cell.
    #[inline]
    pub fn is_free(&self, pos: Position) -> bool {
        let cell = self.cell(pos);
        cell.occupant.is_none() && !cell.food
    }

    /// The neighbour of `pos` in `direction`, or `None` if that leaves the grid.
    pub fn step(&self, pos: Position, direction: Direction) -> Option<Position> {
        let next = match direction {
            Direction::Up => Position::new(pos.x, pos.y.checked_sub(1)?),
            Direction::Down => Position::new(pos.x, pos.y + 1),
            Direction::Left => Position::new(pos.x.checked_sub(1)?, pos.y),
            Direction::Right => Position::new(pos.x + 1, pos.y),
        };
        self.contains(next).then_some(next)
    }

    /// All cells with their positions, x-major.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        let height = self.height;
        self.cells.iter().enumerate().map(move |(i, cell)| {
            let i = i as u32;
            (Position::new(i / height, i % height), cell)
        })
    }

    /// Positions holding food, x-major.
    pub fn food_positions(&self) -> Vec<Position> {
        self.iter()
            .filter(|(_, cell)| cell.food)
            .map(|(pos, _)| pos)
            .collect()
    }
}
