//! The static movie and show catalog.
//!
//! Catalog data is fixed at startup; the simulator has no content management
//! surface. Lookups return references into the catalog.

use crate::types::{Movie, Show};

/// The movie and show catalog backing show selection.
#[derive(Debug, Clone)]
pub struct Catalog {
    movies: Vec<Movie>,
    shows: Vec<Show>,
}

impl Catalog {
    /// The built-in catalog: three movies across four shows.
    #[must_use]
    pub fn builtin() -> Self {
        let movies = vec![
            Movie {
                id: "m1".to_string(),
                title: "Interstellar".to_string(),
                genre: "Sci-Fi".to_string(),
                duration: "2h 49m".to_string(),
                rating: "8.6".to_string(),
            },
            Movie {
                id: "m2".to_string(),
                title: "Inception".to_string(),
                genre: "Thriller".to_string(),
                duration: "2h 28m".to_string(),
                rating: "8.8".to_string(),
            },
            Movie {
                id: "m3".to_string(),
                title: "The Dark Knight".to_string(),
                genre: "Action".to_string(),
                duration: "2h 32m".to_string(),
                rating: "9.0".to_string(),
            },
        ];
        let shows = vec![
            Show {
                id: "s1".to_string(),
                movie_id: "m1".to_string(),
                time: "14:30".to_string(),
                theater: "IMAX Screen 1".to_string(),
                price: 15,
            },
            Show {
                id: "s2".to_string(),
                movie_id: "m1".to_string(),
                time: "18:00".to_string(),
                theater: "IMAX Screen 1".to_string(),
                price: 18,
            },
            Show {
                id: "s3".to_string(),
                movie_id: "m2".to_string(),
                time: "15:00".to_string(),
                theater: "Screen 4".to_string(),
                price: 12,
            },
            Show {
                id: "s4".to_string(),
                movie_id: "m3".to_string(),
                time: "20:15".to_string(),
                theater: "Screen 2".to_string(),
                price: 14,
            },
        ];
        Self { movies, shows }
    }

    /// All movies, in catalog order.
    #[must_use]
    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    /// Looks up a movie by id.
    #[must_use]
    pub fn movie(&self, movie_id: &str) -> Option<&Movie> {
        self.movies.iter().find(|m| m.id == movie_id)
    }

    /// Looks up a show by id.
    #[must_use]
    pub fn show(&self, show_id: &str) -> Option<&Show> {
        self.shows.iter().find(|s| s.id == show_id)
    }

    /// All shows screening the given movie, in catalog order.
    pub fn shows_for(&self, movie_id: &str) -> impl Iterator<Item = &Show> {
        self.shows.iter().filter(move |s| s.movie_id == movie_id)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
