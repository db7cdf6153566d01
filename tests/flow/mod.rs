mod benchmark;
mod scripted;
