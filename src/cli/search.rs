use tabled::Table;

use crate::{
    bridge::Bridge,
    error, info,
    types::{ArtistResult, ArtistTableRow, ResultSource, SearchResultSet, SearchTableRow},
    utils, warning,
};

pub async fn search(bridge: &Bridge, text: &str, external: bool, json: bool) {
    if json {
        println!("{}", bridge.fetch_search(text, external).await);
        return;
    }

    let pb = super::spinner(format!("Searching for \"{}\"...", text.trim()));
    let result = bridge.search().search(text, external).await;
    pb.finish_and_clear();

    let results = match result {
        Ok(results) => results,
        Err(e) => error!("Search failed. Err: {}", e),
    };

    if results.is_empty() {
        warning!("Nothing found for \"{}\"", text.trim());
        return;
    }
    if results.external_searched {
        info!("No Localify matches, showing Spotify results");
    }

    println!("{}", Table::new(search_rows(results)));
}

pub async fn search_artists(bridge: &Bridge, text: &str, limit: i32, json: bool) {
    if json {
        println!("{}", bridge.fetch_search_artists(text, limit).await);
        return;
    }

    let Ok(limit) = usize::try_from(limit) else {
        error!("Limit must be a positive number, got {}", limit);
    };

    let pb = super::spinner(format!("Searching artists for \"{}\"...", text.trim()));
    let result = bridge.search().search_artists(text, limit).await;
    pb.finish_and_clear();

    match result {
        Ok(artists) if artists.is_empty() => warning!("No artists found"),
        Ok(artists) => {
            let rows: Vec<ArtistTableRow> = artists.into_iter().map(artist_row).collect();
            println!("{}", Table::new(rows));
        }
        Err(e) => error!("Artist search failed. Err: {}", e),
    }
}

fn artist_row(artist: ArtistResult) -> ArtistTableRow {
    ArtistTableRow {
        name: artist.name,
        popularity: artist.popularity,
        genres: utils::join_first(&artist.genres, 3),
        favorite: utils::favorite_mark(artist.is_favorite),
        source: match artist.source {
            ResultSource::Localify => "localify".to_string(),
            ResultSource::Spotify => "spotify".to_string(),
        },
    }
}

fn search_rows(results: SearchResultSet) -> Vec<SearchTableRow> {
    let mut rows = Vec::new();

    for artist in results.artists {
        rows.push(SearchTableRow {
            kind: "artist".to_string(),
            detail: utils::join_first(&artist.genres, 3),
            favorite: utils::favorite_mark(artist.is_favorite),
            name: artist.name,
        });
    }
    for event in results.events {
        rows.push(SearchTableRow {
            kind: "event".to_string(),
            detail: format!("{} @ {}", event.start_date, event.venue_name),
            favorite: utils::favorite_mark(event.is_favorite),
            name: event.name,
        });
    }
    for venue in results.venues {
        rows.push(SearchTableRow {
            kind: "venue".to_string(),
            detail: format!("{}, {}", venue.city, venue.country),
            favorite: utils::favorite_mark(venue.is_favorite),
            name: venue.name,
        });
    }
    for city in results.cities {
        rows.push(SearchTableRow {
            kind: "city".to_string(),
            detail: format!("{}, {}", city.state, city.country),
            favorite: String::new(),
            name: city.name,
        });
    }

    rows
}
