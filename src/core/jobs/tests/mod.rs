mod state_machine;
