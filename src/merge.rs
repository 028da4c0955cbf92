use std::collections::HashSet;

use crate::counter::ErrorCounter;
use crate::model::{movie_id_from_href, DedupSet, MovieRef, UserProfile, VoteEdge, VoteItem};

/// Records ready to be appended, in the order they should be written.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Batch {
    pub users: Vec<UserProfile>,
    pub votes: Vec<VoteEdge>,
    pub movies: Vec<MovieRef>,
}

/// Turns crawled users into user, vote and movie records.
///
/// A movie is only emitted if it is not in `saved` and no earlier user of the same batch
/// already referenced it. Items whose url carries no movie id are dropped and counted.
pub fn merge_batch(
    crawled: Vec<(UserProfile, Vec<VoteItem>)>,
    saved: &DedupSet,
    counter: &mut ErrorCounter,
) -> Batch {
    let mut batch = Batch::default();
    let mut selected: HashSet<u64> = HashSet::new();

    for (profile, items) in crawled {
        let user_id = profile.user_id;
        batch.users.push(profile);

        for item in items {
            let Some(movie_id) = counter.absorb("movie_id", movie_id_from_href(&item.href)) else {
                continue;
            };
            if !saved.contains(movie_id) && selected.insert(movie_id) {
                batch.movies.push(MovieRef::from_item(movie_id, &item));
            }
            batch.votes.push(VoteEdge {
                user_id,
                movie_id,
                vote: item.vote,
                date: item.date,
            });
        }
    }
    batch
}
