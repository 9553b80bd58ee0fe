mod entrypoint;
mod release;
