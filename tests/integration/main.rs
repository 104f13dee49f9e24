//! Integration tests: the desk wired to real storage backends, the
//! simulator and a scripted recommender.

mod accounts;
mod mock_recommender;
mod simulation;
