//! Fixed league/team catalog used to generate fixtures.

use crate::types::Sport;

pub struct League {
    pub name: &'static str,
    pub teams: &'static [&'static str],
}

const SOCCER: &[League] = &[
    League {
        name: "Premier League",
        teams: &["Man City", "Arsenal", "Liverpool", "Man Utd", "Chelsea", "Tottenham", "Aston Villa", "Newcastle"],
    },
    League {
        name: "La Liga",
        teams: &["Real Madrid", "Barcelona", "Atletico Madrid", "Girona", "Athletic Club", "Real Sociedad"],
    },
    League {
        name: "Bundesliga",
        teams: &["Bayer Leverkusen", "Bayern Munich", "Stuttgart", "RB Leipzig", "Dortmund", "Frankfurt"],
    },
    League {
        name: "Serie A",
        teams: &["Inter Milan", "AC Milan", "Juventus", "Bologna", "Roma", "Atalanta", "Napoli"],
    },
    League {
        name: "Ligue 1",
        teams: &["PSG", "Monaco", "Brest", "Lille", "Nice", "Lyon"],
    },
    League {
        name: "MLS",
        teams: &["Inter Miami", "Columbus Crew", "LAFC", "FC Cincinnati", "Real Salt Lake"],
    },
    League {
        name: "PSL (RSA)",
        teams: &["Sundowns", "Orlando Pirates", "Kaizer Chiefs", "Stellenbosch", "SuperSport Utd"],
    },
    League {
        name: "Champions League",
        teams: &["Real Madrid", "Man City", "Bayern Munich", "PSG", "Inter Milan", "Arsenal"],
    },
];

const BASKETBALL: &[League] = &[
    League {
        name: "NBA",
        teams: &["Celtics", "Nuggets", "Timberwolves", "Thunder", "Mavericks", "Knicks", "Lakers", "Warriors"],
    },
    League {
        name: "EuroLeague",
        teams: &["Real Madrid BC", "Panathinaikos", "Monaco", "Olympiacos", "Fenerbahce"],
    },
];

const RUGBY: &[League] = &[
    League {
        name: "URC",
        teams: &["Stormers", "Bulls", "Leinster", "Munster", "Glasgow Warriors", "Sharks"],
    },
    League {
        name: "Super Rugby",
        teams: &["Blues", "Hurricanes", "Brumbies", "Chiefs", "Reds", "Crusaders"],
    },
    League {
        name: "Six Nations",
        teams: &["Ireland", "France", "England", "Scotland", "Wales", "Italy"],
    },
    League {
        name: "Rugby Championship",
        teams: &["Springboks", "All Blacks", "Wallabies", "Los Pumas"],
    },
];

const CRICKET: &[League] = &[
    League {
        name: "IPL",
        teams: &["KKR", "SRH", "RR", "RCB", "CSK", "DC", "LSG", "GT", "PBKS", "MI"],
    },
    League {
        name: "Big Bash",
        teams: &["Heat", "Sixers", "Scorchers", "Strikers", "Stars", "Renegades"],
    },
    League {
        name: "International T20",
        teams: &["India", "Australia", "Proteas", "England", "Pakistan", "West Indies"],
    },
];

const NFL: &[League] = &[League {
    name: "NFL",
    teams: &["Chiefs", "49ers", "Ravens", "Lions", "Eagles", "Cowboys", "Bills", "Packers"],
}];

/// Leagues available for a sport.
pub fn leagues(sport: Sport) -> &'static [League] {
    match sport {
        Sport::Soccer => SOCCER,
        Sport::Basketball => BASKETBALL,
        Sport::Rugby => RUGBY,
        Sport::Cricket => CRICKET,
        Sport::Nfl => NFL,
    }
}
