mod decision;
mod routing_table;
