mod leaderboard;
mod scans;
mod scores;
